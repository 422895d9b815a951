//! Conversion of catalog columns into `ndarray` arrays and common operations on them.

use itertools::Itertools;
use ndarray::{Array2, ArrayView1, Axis};

use crate::error::{CatalogError, Result};
use crate::table::{Catalog, ColumnData, ColumnKind};

/// Sky positions of a catalog in degrees. Shape `(n_rows, 2)`.
///
/// Every row has to hold a right ascension in `[0, 360)` and a declination in `[-90, 90]`.
pub(crate) fn radecs(catalog: &Catalog, ra_col: &str, dec_col: &str) -> Result<Array2<f64>> {
    let ra = coordinate_column(catalog, ra_col, |ra| (0.0..360.0).contains(&ra))?;
    let dec = coordinate_column(catalog, dec_col, |dec| (-90.0..=90.0).contains(&dec))?;

    let flat = ra
        .into_iter()
        .zip(dec)
        .flat_map(|(ra, dec)| [ra, dec])
        .collect_vec();
    Ok(Array2::from_shape_vec((catalog.len(), 2), flat)
        .expect("coordinate columns have the catalog length"))
}

/// Check that all required coordinate columns exist, without looking at their values.
pub(crate) fn require_columns(catalog: &Catalog, columns: &[&str]) -> Result<()> {
    match columns.iter().find(|c| !catalog.contains(c)) {
        Some(missing) => Err(CatalogError::missing_column(*missing)),
        None => Ok(()),
    }
}

fn coordinate_column(
    catalog: &Catalog,
    name: &str,
    in_range: impl Fn(f64) -> bool,
) -> Result<Vec<f64>> {
    let column = catalog.column(name)?;
    if let ColumnData::Str(_) = column {
        return Err(CatalogError::TypeMismatch {
            column: name.to_owned(),
            expected: ColumnKind::Float,
            actual: ColumnKind::Str,
        });
    }

    (0..column.len())
        .map(|row| {
            let value = column
                .f64_at(row)
                .ok_or_else(|| CatalogError::MissingCoordinate {
                    column: name.to_owned(),
                    row,
                })?;
            if value.is_finite() && in_range(value) {
                Ok(value)
            } else {
                Err(CatalogError::InvalidCoordinate {
                    column: name.to_owned(),
                    row,
                    value,
                })
            }
        })
        .collect()
}

/// Rows of a `(n, 2)` array as `(ra, dec)` tuples.
pub(crate) fn rows_as_pairs(arr: &Array2<f64>) -> impl Iterator<Item = (f64, f64)> + '_ {
    arr.axis_iter(Axis(0)).map(|r| (r[0], r[1]))
}

pub(crate) fn argmin(arr: ArrayView1<f64>) -> Option<usize> {
    arr.iter()
        .enumerate()
        .min_by(|(_, value0), (_, value1)| value0.total_cmp(value1))
        .map(|(idx, _)| idx)
}

pub(crate) fn argmax(arr: ArrayView1<f64>) -> Option<usize> {
    arr.indexed_iter()
        .reduce(|acc, f| if acc.1 >= f.1 { acc } else { f })
        .map(|(idx, _)| idx)
}

/// Stable ascending order of the elements.
pub(crate) fn argsort(arr: ArrayView1<f64>) -> Vec<usize> {
    (0..arr.len())
        .sorted_by(|&a, &b| arr[a].total_cmp(&arr[b]))
        .collect()
}
