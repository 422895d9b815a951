//! Housekeeping on catalogs returned by survey queries.

use std::collections::HashMap;
use std::hash::Hash;

use itertools::Itertools;
use log::{debug, warn};
use ndarray::Array1;

use crate::angle::Angle;
use crate::error::{CatalogError, Result};
use crate::geometry::angular_separation;
use crate::ndarray_utils::{argmax, argmin, argsort, radecs, require_columns, rows_as_pairs};
use crate::table::{Catalog, ColumnData, ColumnKind, Value};

/// Name of the column added by [`sort_by_separation`].
pub const SEPARATION_COLUMN: &str = "separation";

/// Rename the `RA`/`DEC` columns of a HEASARC query result to `ra`/`dec`, in degrees.
///
/// The catalog is modified in place. If either column is missing, or `ra`/`dec` already
/// exist, an error is returned and nothing is changed.
pub fn clean_heasarc(catalog: &mut Catalog) -> Result<()> {
    require_columns(catalog, &["RA", "DEC"])?;
    if let Some(existing) = ["ra", "dec"].into_iter().find(|c| catalog.contains(c)) {
        return Err(CatalogError::DuplicateColumn {
            column: existing.to_owned(),
        });
    }
    for (old, new) in [("RA", "ra"), ("DEC", "dec")] {
        catalog.rename_column(old, new)?;
        catalog.set_unit(new, "deg")?;
    }
    Ok(())
}

/// Rename survey-specific columns and optionally fill masked cells.
///
/// `renames` holds `(new, old)` pairs. Pairs whose `old` column does not exist are skipped.
pub fn clean_cat(
    catalog: &Catalog,
    renames: &[(&str, &str)],
    fill_mask: Option<Value>,
) -> Result<Catalog> {
    let mut cleaned = catalog.clone();
    for (new, old) in renames {
        if cleaned.contains(old) {
            cleaned.rename_column(old, new)?;
        }
    }
    Ok(match fill_mask {
        Some(value) if cleaned.has_missing() => cleaned.filled(value),
        _ => cleaned,
    })
}

/// Sort the rows by their separation from `center`, closest first.
///
/// `radec` names the coordinate columns in degrees. With `add_sep`, a column
/// [`SEPARATION_COLUMN`] in arcminutes is added (or overwritten) before sorting.
pub fn sort_by_separation(
    catalog: &Catalog,
    center: (f64, f64),
    radec: (&str, &str),
    add_sep: bool,
) -> Result<Catalog> {
    require_columns(catalog, &[radec.0, radec.1])?;
    let seps = separations(catalog, center, radec)?;
    let order = argsort(seps.view());

    let mut catalog = catalog.clone();
    if add_sep {
        let arcmin = ColumnData::from(seps.iter().map(|s| s.to_degrees() * 60.).collect_vec());
        if catalog.contains(SEPARATION_COLUMN) {
            catalog.replace_column(SEPARATION_COLUMN, arcmin)?;
        } else {
            catalog.add_column(SEPARATION_COLUMN, arcmin)?;
        }
        catalog.set_unit(SEPARATION_COLUMN, "arcmin")?;
    }
    Ok(catalog.take(&order))
}

/// Separations in radians of all rows from `center`.
fn separations(catalog: &Catalog, center: (f64, f64), radec: (&str, &str)) -> Result<Array1<f64>> {
    let positions = radecs(catalog, radec.0, radec.1)?;
    Ok(rows_as_pairs(&positions)
        .map(|p| angular_separation(center, p).radians())
        .collect())
}

/// Row in `match_ids` of every element of `ids`.
///
/// If an ID occurs several times in `match_ids`, its first row is returned.
/// IDs that do not occur map to `None`, unless `require_in_match` is set,
/// in which case [`CatalogError::UnmatchedIds`] is returned.
///
/// # Example:
/// ```
/// # use catmatch::match_ids;
/// let rows = match_ids(&[3, 7, 5], &[5, 3, 3, 9], false).unwrap();
/// assert_eq!(rows, [Some(1), None, Some(0)]);
/// ```
pub fn match_ids<T: Eq + Hash>(
    ids: &[T],
    match_ids: &[T],
    require_in_match: bool,
) -> Result<Vec<Option<usize>>> {
    let mut first_row = HashMap::with_capacity(match_ids.len());
    for (row, id) in match_ids.iter().enumerate() {
        first_row.entry(id).or_insert(row);
    }

    let rows = ids.iter().map(|id| first_row.get(id).copied()).collect_vec();
    let n_unmatched = rows.iter().filter(|r| r.is_none()).count();
    if require_in_match && n_unmatched > 0 {
        return Err(CatalogError::UnmatchedIds { count: n_unmatched });
    }
    Ok(rows)
}

/// Short text description of the sources within `radius` of `center`.
///
/// The catalog needs `ra`/`dec` columns, the numeric column `photom_column` and a
/// `survey` metadata entry. If `magnitude` is set, the brightest source is the one with
/// the smallest value, otherwise the one with the largest.
pub fn summarize_catalog(
    catalog: &Catalog,
    center: (f64, f64),
    radius: Angle,
    photom_column: &str,
    magnitude: bool,
) -> Result<Vec<String>> {
    require_columns(catalog, &["ra", "dec", photom_column])?;
    let survey = catalog.meta().get("survey").ok_or_else(|| {
        CatalogError::invalid_configuration("catalog has no 'survey' metadata entry")
    })?;
    let photometry = catalog.column(photom_column)?;
    if photometry.kind() == ColumnKind::Str {
        return Err(CatalogError::TypeMismatch {
            column: photom_column.to_owned(),
            expected: ColumnKind::Float,
            actual: ColumnKind::Str,
        });
    }

    let seps = separations(catalog, center, ("ra", "dec"))?;
    let inside = (0..catalog.len())
        .filter(|&row| seps[row] < radius.radians())
        .collect_vec();

    let mut summary = vec![format!(
        "{survey}: There are {} source(s) within {:.1} arcsec",
        inside.len(),
        radius.arcseconds()
    )];
    if inside.is_empty() {
        return Ok(summary);
    }

    let measured = inside
        .iter()
        .filter_map(|&row| photometry.f64_at(row).map(|value| (row, value)))
        .collect_vec();
    let values = measured.iter().map(|m| m.1).collect::<Array1<f64>>();
    let brightest = if magnitude {
        argmin(values.view())
    } else {
        argmax(values.view())
    };
    match brightest {
        Some(idx) => summary.push(format!(
            "{survey}: The brightest source has {photom_column} of {:.2}",
            measured[idx].1
        )),
        None => warn!("No source within the radius has a value in '{photom_column}'."),
    }

    let inside_seps = inside.iter().map(|&row| seps[row]).collect::<Array1<f64>>();
    if let Some(idx) = argmin(inside_seps.view()) {
        let closest = inside[idx];
        let value = match photometry.f64_at(closest) {
            Some(value) => format!("{value:.2}"),
            None => Value::Missing.to_string(),
        };
        let sep = Angle::from_radians(inside_seps[idx]).arcseconds();
        summary.push(format!(
            "{survey}: The closest source is at separation {sep:.2} arcsec \
             and has {photom_column} of {value}"
        ));
    }
    Ok(summary)
}

/// Keep only the first row of every ID in column `idcol`.
///
/// The result is sorted by `idcol`. Rows whose ID is masked are all kept.
pub fn remove_duplicates(catalog: &Catalog, idcol: &str) -> Result<Catalog> {
    let order = catalog.argsort(idcol)?;
    let ids = catalog.column(idcol)?;

    let unique = order
        .iter()
        .enumerate()
        .filter(|&(k, &row)| {
            k == 0 || ids.is_missing(row) || ids.get(row) != ids.get(order[k - 1])
        })
        .map(|(_, &row)| row)
        .collect_vec();
    debug!(
        "Removed {} duplicate rows by '{idcol}'.",
        catalog.len() - unique.len()
    );
    Ok(catalog.take(&unique))
}
