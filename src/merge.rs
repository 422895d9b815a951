//! Cross-match two catalogs and merge them into their union.
//!
//! The merged catalog holds one row per matched pair, followed by the rows that found no
//! partner. Non-coordinate columns present in both catalogs are told apart by a suffix,
//! and a single `ra`/`dec` pair is kept, taken from the first catalog for matched rows.

use std::collections::{HashMap, VecDeque};

use itertools::Itertools;
use log::{debug, info};
use ndarray::Array2;

use crate::angle::Angle;
use crate::error::{CatalogError, Result};
use crate::matching::{CrossMatcher, KdTreeMatcher, MatchedPair, SpatialMatcher};
use crate::table::{Catalog, ColumnData, ColumnKind, Field, SENTINEL, Schema};

const RA: &str = "ra";
const DEC: &str = "dec";

/// Where the cells of an output column come from.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Source {
    /// Right ascension (`0`) or declination (`1`) of whichever row is present.
    Coordinate(usize),
    /// Column of the first catalog.
    Left(usize),
    /// Column of the second catalog.
    Right(usize),
}

/// Rows of both catalogs that make up one output row.
#[derive(Clone, Copy, Debug, PartialEq)]
struct RowSource {
    left: Option<usize>,
    right: Option<usize>,
}

impl RowSource {
    fn both(left: usize, right: usize) -> Self {
        Self {
            left: Some(left),
            right: Some(right),
        }
    }

    fn left(left: usize) -> Self {
        Self {
            left: Some(left),
            right: None,
        }
    }

    fn right(right: usize) -> Self {
        Self {
            left: None,
            right: Some(right),
        }
    }
}

/// Merges two catalogs after cross-matching them.
///
/// Both catalogs need the columns `ra` and `dec` in degrees.
///
/// # Parameters
/// - `tolerance`: Maximum separation of a match (strict). Default 1".
/// - `table_names`: Suffixes appended as `{column}_{name}` to non-coordinate columns
///     present in both catalogs. Default `("1", "2")`.
///
/// # Example:
/// ```
/// # use catmatch::{Angle, Catalog, CatalogMerger, ColumnData, Value};
/// let tab1 = Catalog::from_columns([
///     ("ra", ColumnData::from(vec![10.])),
///     ("dec", ColumnData::from(vec![20.])),
///     ("flux", ColumnData::from(vec![5.])),
/// ]).unwrap();
/// let tab2 = Catalog::from_columns([
///     ("ra", ColumnData::from(vec![10.0001])),
///     ("dec", ColumnData::from(vec![20.])),
///     ("flux", ColumnData::from(vec![7.])),
/// ]).unwrap();
///
/// let merged = CatalogMerger::new()
///     .with_tolerance(Angle::from_arcseconds(5.))
///     .merge(&tab1, &tab2)
///     .unwrap();
/// assert_eq!(merged.len(), 1);
/// assert_eq!(merged.value(0, "flux_1").unwrap(), Value::Float(5.));
/// assert_eq!(merged.value(0, "flux_2").unwrap(), Value::Float(7.));
/// ```
#[derive(Clone, Debug)]
pub struct CatalogMerger<M: SpatialMatcher = KdTreeMatcher> {
    cross_matcher: CrossMatcher<M>,
    table_names: (String, String),
}

impl CatalogMerger<KdTreeMatcher> {
    /// Create a merger with default options.
    pub fn new() -> Self {
        Self {
            cross_matcher: CrossMatcher::new().with_tolerance(Angle::from_arcseconds(1.)),
            table_names: ("1".to_owned(), "2".to_owned()),
        }
    }
}

impl Default for CatalogMerger<KdTreeMatcher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: SpatialMatcher> CatalogMerger<M> {
    /// Use another nearest-neighbour search.
    pub fn with_matcher<N: SpatialMatcher>(self, matcher: N) -> CatalogMerger<N> {
        CatalogMerger {
            cross_matcher: self.cross_matcher.with_matcher(matcher),
            table_names: self.table_names,
        }
    }

    /// Set the maximum separation of a match.
    pub fn with_tolerance(mut self, tolerance: Angle) -> Self {
        self.cross_matcher = self.cross_matcher.with_tolerance(tolerance);
        self
    }

    /// Set the suffixes of colliding column names.
    pub fn with_table_names(mut self, name1: impl Into<String>, name2: impl Into<String>) -> Self {
        self.table_names = (name1.into(), name2.into());
        self
    }

    /// Cross-match and merge two catalogs, filling absent cells with [`SENTINEL`].
    pub fn merge(&self, tab1: &Catalog, tab2: &Catalog) -> Result<Catalog> {
        Ok(self.merge_with(tab1, tab2, false)?.filled(SENTINEL))
    }

    /// Cross-match and merge two catalogs, leaving absent cells masked.
    pub fn merge_unfilled(&self, tab1: &Catalog, tab2: &Catalog) -> Result<Catalog> {
        self.merge_with(tab1, tab2, false)
    }

    fn merge_with(&self, tab1: &Catalog, tab2: &Catalog, parallel: bool) -> Result<Catalog> {
        self.validate_table_names()?;
        let (radecs1, radecs2) = self.cross_matcher.coordinates(tab1, tab2)?;
        let (schema, sources) = self.plan_columns(tab1, tab2)?;

        let pairs = self
            .cross_matcher
            .accept(radecs1.view(), radecs2.view(), parallel);
        let pairs = one_to_one(pairs, tab2.len());

        let mut rows = pairs
            .iter()
            .map(|p| RowSource::both(p.index1, p.index2))
            .collect_vec();
        let n_matched = rows.len();

        let mut matched1 = vec![false; tab1.len()];
        let mut matched2 = vec![false; tab2.len()];
        for p in &pairs {
            matched1[p.index1] = true;
            matched2[p.index2] = true;
        }
        let unmatched1 = (0..tab1.len()).filter(|&i| !matched1[i]).collect_vec();
        let unmatched2 = (0..tab2.len()).filter(|&j| !matched2[j]).collect_vec();
        debug!(
            "{} unmatched rows in the first and {} in the second catalog.",
            unmatched1.len(),
            unmatched2.len()
        );

        match (unmatched1.is_empty(), unmatched2.is_empty()) {
            (false, false) => rows.extend(outer_join(&unmatched1, &unmatched2, &radecs1, &radecs2)),
            (false, true) => rows.extend(unmatched1.into_iter().map(RowSource::left)),
            (true, false) => rows.extend(unmatched2.into_iter().map(RowSource::right)),
            (true, true) => {}
        }

        info!(
            "Merged {} and {} rows into {} rows, {} of them matched.",
            tab1.len(),
            tab2.len(),
            rows.len(),
            n_matched
        );

        let left = rows.iter().map(|r| r.left).collect_vec();
        let right = rows.iter().map(|r| r.right).collect_vec();
        let columns = sources
            .iter()
            .map(|source| match *source {
                Source::Coordinate(axis) => ColumnData::Float(
                    rows.iter()
                        .map(|r| match (r.left, r.right) {
                            (Some(i), _) => Some(radecs1[[i, axis]]),
                            (None, Some(j)) => Some(radecs2[[j, axis]]),
                            (None, None) => None,
                        })
                        .collect(),
                ),
                Source::Left(idx) => tab1.column_at(idx).gather(&left),
                Source::Right(idx) => tab2.column_at(idx).gather(&right),
            })
            .collect_vec();

        let mut merged = Catalog::from_parts(schema, columns, rows.len());
        for (key, value) in tab2.meta().iter().chain(tab1.meta()) {
            merged.meta_mut().insert(key.clone(), value.clone());
        }
        Ok(merged)
    }

    fn validate_table_names(&self) -> Result<()> {
        let (name1, name2) = &self.table_names;
        if name1.is_empty() || name2.is_empty() {
            return Err(CatalogError::invalid_configuration(
                "table names must not be empty",
            ));
        }
        if name1 == name2 {
            return Err(CatalogError::invalid_configuration(format!(
                "table names must differ, got '{name1}' twice"
            )));
        }
        Ok(())
    }

    /// Output schema: the columns of `tab1` in order, then those of `tab2` except `ra`/`dec`.
    fn plan_columns(&self, tab1: &Catalog, tab2: &Catalog) -> Result<(Schema, Vec<Source>)> {
        let collides = |name: &str| {
            name != RA && name != DEC && tab1.contains(name) && tab2.contains(name)
        };
        let rename = |name: &str, suffix: &str| {
            if collides(name) {
                format!("{name}_{suffix}")
            } else {
                name.to_owned()
            }
        };

        let mut fields = Vec::with_capacity(tab1.n_columns() + tab2.n_columns());
        let mut sources = Vec::with_capacity(fields.capacity());

        for (idx, field) in tab1.schema().fields().iter().enumerate() {
            let (kind, source) = match field.name.as_str() {
                RA => (ColumnKind::Float, Source::Coordinate(0)),
                DEC => (ColumnKind::Float, Source::Coordinate(1)),
                _ => (field.kind, Source::Left(idx)),
            };
            fields.push(Field {
                name: rename(&field.name, &self.table_names.0),
                kind,
                unit: field.unit.clone(),
            });
            sources.push(source);
        }
        for (idx, field) in tab2.schema().fields().iter().enumerate() {
            if field.name == RA || field.name == DEC {
                continue;
            }
            fields.push(Field {
                name: rename(&field.name, &self.table_names.1),
                kind: field.kind,
                unit: field.unit.clone(),
            });
            sources.push(Source::Right(idx));
        }

        Ok((Schema::new(fields)?, sources))
    }
}

#[cfg(feature = "parallel")]
impl<M: SpatialMatcher> CatalogMerger<M> {
    /// Cross-match and merge two catalogs, matching in parallel.
    ///
    /// Also see [`merge`](CatalogMerger::merge()) for more details.
    pub fn merge_par(&self, tab1: &Catalog, tab2: &Catalog) -> Result<Catalog> {
        Ok(self.merge_with(tab1, tab2, true)?.filled(SENTINEL))
    }
}

/// Keep at most one pair per row of the second catalog, the one with the smallest separation.
///
/// On equal separations, the pair with the lower first index is kept.
/// The result stays ordered by the first index.
fn one_to_one(pairs: Vec<MatchedPair>, n2: usize) -> Vec<MatchedPair> {
    let mut best: Vec<Option<usize>> = vec![None; n2];
    for (k, pair) in pairs.iter().enumerate() {
        let closer = match best[pair.index2] {
            Some(current) => pair.separation < pairs[current].separation,
            None => true,
        };
        if closer {
            best[pair.index2] = Some(k);
        }
    }

    let n_pairs = pairs.len();
    let unique = pairs
        .into_iter()
        .enumerate()
        .filter(|(k, pair)| best[pair.index2] == Some(*k))
        .map(|(_, pair)| pair)
        .collect_vec();
    if unique.len() < n_pairs {
        debug!(
            "Dropped {} matches to sources that were already matched more closely.",
            n_pairs - unique.len()
        );
    }
    unique
}

/// Full outer join of the unmatched rows on exact equality of their coordinates.
///
/// Rows with equal coordinates are combined pairwise in order of appearance,
/// all other rows stand alone. The result is sorted by right ascension and declination.
fn outer_join(
    unmatched1: &[usize],
    unmatched2: &[usize],
    radecs1: &Array2<f64>,
    radecs2: &Array2<f64>,
) -> Vec<RowSource> {
    // Adding zero maps -0.0 to 0.0, so the bit patterns agree whenever the values do.
    let key = |radecs: &Array2<f64>, row: usize| {
        (
            (radecs[[row, 0]] + 0.).to_bits(),
            (radecs[[row, 1]] + 0.).to_bits(),
        )
    };

    let mut by_position: HashMap<(u64, u64), VecDeque<usize>> = HashMap::new();
    for &j in unmatched2 {
        by_position.entry(key(radecs2, j)).or_default().push_back(j);
    }

    let mut joined = Vec::with_capacity(unmatched1.len() + unmatched2.len());
    let mut paired2 = vec![false; radecs2.nrows()];
    for &i in unmatched1 {
        match by_position.get_mut(&key(radecs1, i)).and_then(VecDeque::pop_front) {
            Some(j) => {
                paired2[j] = true;
                joined.push(RowSource::both(i, j));
            }
            None => joined.push(RowSource::left(i)),
        }
    }
    joined.extend(
        unmatched2
            .iter()
            .filter(|&&j| !paired2[j])
            .map(|&j| RowSource::right(j)),
    );
    debug!(
        "Joined {} unmatched rows with identical coordinates.",
        joined.iter().filter(|r| r.left.is_some() && r.right.is_some()).count()
    );

    let position = |r: &RowSource| match (r.left, r.right) {
        (Some(i), _) => (radecs1[[i, 0]], radecs1[[i, 1]]),
        (None, Some(j)) => (radecs2[[j, 0]], radecs2[[j, 1]]),
        (None, None) => (f64::NAN, f64::NAN),
    };
    joined.sort_by(|a, b| {
        let (ra_a, dec_a) = position(a);
        let (ra_b, dec_b) = position(b);
        ra_a.total_cmp(&ra_b).then(dec_a.total_cmp(&dec_b))
    });
    joined
}

/// Cross-match and merge two catalogs on their `ra`/`dec` columns.
///
/// Shorthand for [`CatalogMerger`] with the given tolerance and table names.
pub fn xmatch_and_merge_cats(
    tab1: &Catalog,
    tab2: &Catalog,
    tolerance: Angle,
    table_names: (&str, &str),
) -> Result<Catalog> {
    CatalogMerger::new()
        .with_tolerance(tolerance)
        .with_table_names(table_names.0, table_names.1)
        .merge(tab1, tab2)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::Array1;
    use ndarray_rand::{RandomExt, rand_distr::Uniform};
    use rand::Rng;

    use super::*;
    use crate::table::Value;

    fn init_logger() {
        let _ = simplelog::TestLogger::init(log::LevelFilter::Debug, simplelog::Config::default());
    }

    fn catalog(radecs: &[(f64, f64)], extra: &[(&str, ColumnData)]) -> Catalog {
        let mut cat = Catalog::from_columns([
            ("ra", ColumnData::from(radecs.iter().map(|r| r.0).collect_vec())),
            ("dec", ColumnData::from(radecs.iter().map(|r| r.1).collect_vec())),
        ])
        .unwrap();
        for (name, data) in extra {
            cat.add_column(*name, data.clone()).unwrap();
        }
        cat
    }

    fn count_ra_dec(cat: &Catalog) -> (usize, usize) {
        (
            cat.column_names().filter(|n| *n == "ra").count(),
            cat.column_names().filter(|n| *n == "dec").count(),
        )
    }

    #[test]
    fn single_match() {
        init_logger();
        let a = catalog(&[(10., 20.)], &[("flux", ColumnData::from(vec![5_i64]))]);
        let b = catalog(&[(10.0001, 20.)], &[("flux", ColumnData::from(vec![7_i64]))]);

        let merged = xmatch_and_merge_cats(&a, &b, Angle::from_arcseconds(5.), ("1", "2")).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.column_names().collect_vec(), ["ra", "dec", "flux_1", "flux_2"]);
        assert_eq!(
            merged.row(0).unwrap(),
            vec![Value::Float(10.), Value::Float(20.), Value::Int(5), Value::Int(7)]
        );
    }

    #[test]
    fn no_match() {
        init_logger();
        let a = catalog(&[(0., 0.)], &[("g", ColumnData::from(vec![21.5]))]);
        let b = catalog(&[(90., 0.)], &[("W1", ColumnData::from(vec![15.2]))]);

        let merged = CatalogMerger::new().merge(&a, &b).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.column_names().collect_vec(), ["ra", "dec", "g", "W1"]);
        assert_eq!(
            merged.row(0).unwrap(),
            vec![Value::Float(0.), Value::Float(0.), Value::Float(21.5), Value::Float(-999.)]
        );
        assert_eq!(
            merged.row(1).unwrap(),
            vec![Value::Float(90.), Value::Float(0.), Value::Float(-999.), Value::Float(15.2)]
        );
    }

    #[test]
    fn masked_coordinate_fails() {
        let a = Catalog::from_columns([
            ("ra", ColumnData::from(vec![None, Some(3.)])),
            ("dec", ColumnData::from(vec![1., 2.])),
        ])
        .unwrap();
        let b = catalog(&[(3., 2.)], &[]);

        assert_eq!(
            CatalogMerger::new().merge(&a, &b),
            Err(CatalogError::MissingCoordinate {
                column: "ra".into(),
                row: 0
            })
        );
    }

    #[test]
    fn missing_coordinate_column() {
        let a = catalog(&[(3., 2.)], &[]);
        let mut b = catalog(&[(3., 2.)], &[]);
        b.rename_column("dec", "DEC").unwrap();

        assert_eq!(
            CatalogMerger::new().merge(&a, &b),
            Err(CatalogError::MissingColumn { column: "dec".into() })
        );
    }

    #[test]
    fn invalid_table_names() {
        let a = catalog(&[(3., 2.)], &[]);
        for (n1, n2) in [("1", "1"), ("", "2"), ("1", "")] {
            assert!(matches!(
                CatalogMerger::new().with_table_names(n1, n2).merge(&a, &a),
                Err(CatalogError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn suffix_collision() {
        let a = catalog(
            &[(3., 2.)],
            &[
                ("flux", ColumnData::from(vec![1.])),
                ("flux_1", ColumnData::from(vec![1.])),
            ],
        );
        let b = catalog(&[(3., 2.)], &[("flux", ColumnData::from(vec![2.]))]);

        assert_eq!(
            CatalogMerger::new().merge(&a, &b),
            Err(CatalogError::DuplicateColumn {
                column: "flux_1".into()
            })
        );
    }

    #[test]
    fn merge_with_itself() {
        init_logger();
        let a = catalog(
            &[(10., 10.), (20., -10.), (30., 45.)],
            &[
                ("flux", ColumnData::from(vec![1., 2., 3.])),
                ("name", ColumnData::from(vec!["x", "y", "z"])),
            ],
        );

        let merged = CatalogMerger::new()
            .with_table_names("des", "wise")
            .merge(&a, &a)
            .unwrap();
        assert_eq!(
            merged.column_names().collect_vec(),
            ["ra", "dec", "flux_des", "name_des", "flux_wise", "name_wise"]
        );
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.column("flux_des").unwrap(), a.column("flux").unwrap());
        assert_eq!(merged.column("flux_wise").unwrap(), a.column("flux").unwrap());
        assert_eq!(merged.column("name_wise").unwrap(), a.column("name").unwrap());
    }

    #[test]
    fn unmatched_rows_of_one_side() {
        let a = catalog(
            &[(10., 10.), (100., 10.)],
            &[("id", ColumnData::from(vec![1_i64, 2]))],
        );
        let b = catalog(&[(10., 10.)], &[("mag", ColumnData::from(vec![19.]))]);

        let merged = CatalogMerger::new().merge(&a, &b).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.column("id").unwrap(), &ColumnData::from(vec![1_i64, 2]));
        assert_eq!(merged.column("mag").unwrap(), &ColumnData::from(vec![19., -999.]));

        let merged = CatalogMerger::new().merge(&b, &a).unwrap();
        assert_eq!(merged.column_names().collect_vec(), ["ra", "dec", "mag", "id"]);
        assert_eq!(merged.column("ra").unwrap(), &ColumnData::from(vec![10., 100.]));
        assert_eq!(merged.column("mag").unwrap(), &ColumnData::from(vec![19., -999.]));
    }

    #[test]
    fn closest_source_wins() {
        init_logger();
        let a = catalog(
            &[(50., 0.00005), (50., 0.0001)],
            &[("id_a", ColumnData::from(vec![0_i64, 1]))],
        );
        let b = catalog(&[(50., 0.00009)], &[("id_b", ColumnData::from(vec![0_i64]))]);

        let pairs = CrossMatcher::new()
            .with_tolerance(Angle::from_arcseconds(1.))
            .matched_pairs(&a, &b)
            .unwrap();
        assert_eq!(pairs.len(), 2);

        let merged = CatalogMerger::new().merge(&a, &b).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.column("id_a").unwrap(), &ColumnData::from(vec![1_i64, 0]));
        assert_eq!(merged.column("id_b").unwrap(), &ColumnData::from(vec![0_i64, -999]));
        assert_eq!(merged.column("dec").unwrap(), &ColumnData::from(vec![0.0001, 0.00005]));
    }

    #[test]
    fn residuals_with_equal_coordinates_are_joined() {
        let a = catalog(
            &[(10., 10.), (10., 10.), (300., -60.)],
            &[("a", ColumnData::from(vec![1_i64, 2, 3]))],
        );
        let b = catalog(
            &[(10., 10.), (10., 10.), (150., 60.)],
            &[("b", ColumnData::from(vec![1_i64, 2, 3]))],
        );

        let merged = CatalogMerger::new().merge_unfilled(&a, &b).unwrap();
        assert_eq!(merged.len(), 4);

        // The inner match and the joined residual both sit at (10, 10).
        let at_origin = (0..merged.len())
            .filter(|&r| merged.value(r, "ra").unwrap() == Value::Float(10.))
            .collect_vec();
        assert_eq!(at_origin.len(), 2);
        for &r in &at_origin {
            assert!(!merged.value(r, "a").unwrap().is_missing());
            assert!(!merged.value(r, "b").unwrap().is_missing());
        }

        // The remaining residuals are ordered by right ascension.
        assert_eq!(merged.value(2, "b").unwrap(), Value::Int(3));
        assert!(merged.value(2, "a").unwrap().is_missing());
        assert_eq!(merged.value(3, "a").unwrap(), Value::Int(3));
        assert!(merged.value(3, "b").unwrap().is_missing());
    }

    #[test]
    fn many_rows_at_one_position() {
        let a = catalog(&[(10., 20.)], &[("a", ColumnData::from(vec![1_i64]))]);
        let b = catalog(
            &vec![(10., 20.); 40],
            &[("b", ColumnData::from((0..40_i64).collect_vec()))],
        );

        let merged = CatalogMerger::new().merge(&a, &b).unwrap();
        assert_eq!(merged.len(), 40);
        assert_eq!(merged.row(0).unwrap()[2..], [Value::Int(1), Value::Int(0)]);
        assert_eq!(
            merged.column("b").unwrap(),
            &ColumnData::from((0..40_i64).collect_vec())
        );
        assert_eq!(count_ra_dec(&merged), (1, 1));
    }

    #[test]
    fn unfilled_keeps_masks_and_meta() {
        let a = catalog(&[(1., 1.)], &[("s", ColumnData::from(vec!["src"]))])
            .with_meta("survey", "DES");
        let b = catalog(&[(2., 2.)], &[("t", ColumnData::from(vec![4_i64]))])
            .with_meta("survey", "WISE")
            .with_meta("release", "allwise");

        let unfilled = CatalogMerger::new().merge_unfilled(&a, &b).unwrap();
        assert!(unfilled.has_missing());
        assert_eq!(unfilled.meta()["survey"], "DES");
        assert_eq!(unfilled.meta()["release"], "allwise");

        let filled = CatalogMerger::new().merge(&a, &b).unwrap();
        assert!(!filled.has_missing());
        assert_eq!(filled.value(1, "s").unwrap(), Value::from("-999"));
        assert_eq!(filled.value(0, "t").unwrap(), Value::Int(-999));
    }

    #[test]
    fn empty_catalogs() {
        let a = catalog(&[], &[("x", ColumnData::from(Vec::<f64>::new()))]);
        let b = catalog(&[(5., 5.)], &[("y", ColumnData::from(vec![1.]))]);

        let merged = CatalogMerger::new().merge(&a, &b).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.column("x").unwrap(), &ColumnData::from(vec![-999.]));

        let merged = CatalogMerger::new().merge(&a, &a).unwrap();
        assert!(merged.is_empty());
        assert_eq!(count_ra_dec(&merged), (1, 1));
    }

    #[test]
    fn every_row_appears_once() {
        init_logger();
        let mut rng = rand::thread_rng();
        let n1 = 300;
        let ra = Array1::random(n1, Uniform::new(0., 360.));
        let dec = Array1::random(n1, Uniform::new(-1., 1.)).mapv(|z: f64| z.asin().to_degrees());
        let radecs1 = ra.iter().copied().zip(dec.iter().copied()).collect_vec();

        // Half of the second catalog are jittered copies of the first, the rest are new sources.
        let mut radecs2 = Vec::new();
        for &(ra, dec) in radecs1.iter().step_by(2) {
            let jitter = rng.gen_range(-2e-4..2e-4);
            radecs2.push((ra, (dec + jitter).clamp(-90., 90.)));
        }
        for _ in 0..150 {
            radecs2.push((rng.gen_range(0.0..360.0), rng.gen_range(-90.0..=90.0)));
        }
        let n2 = radecs2.len();

        let a = catalog(&radecs1, &[("id1", ColumnData::from((0..n1 as i64).collect_vec()))]);
        let b = catalog(&radecs2, &[("id2", ColumnData::from((0..n2 as i64).collect_vec()))]);

        let merged = CatalogMerger::new()
            .with_tolerance(Angle::from_arcseconds(2.))
            .merge(&a, &b)
            .unwrap();
        assert_eq!(count_ra_dec(&merged), (1, 1));

        let ids = |name: &str| {
            let ColumnData::Int(ids) = merged.column(name).unwrap() else {
                panic!("ids are integers")
            };
            ids.iter().map(|id| id.unwrap()).collect_vec()
        };
        let (ids1, ids2) = (ids("id1"), ids("id2"));

        let present1 = ids1.iter().copied().filter(|&id| id != -999).sorted().collect_vec();
        let present2 = ids2.iter().copied().filter(|&id| id != -999).sorted().collect_vec();
        assert_eq!(present1, (0..n1 as i64).collect_vec());
        assert_eq!(present2, (0..n2 as i64).collect_vec());

        let n_pairs = ids1.iter().zip(&ids2).filter(|(a, b)| **a != -999 && **b != -999).count();
        assert!(n_pairs >= n1 / 2 - 5);
        assert_eq!(merged.len(), n1 + n2 - n_pairs);

        // Matched rows carry the coordinates of the first catalog.
        for row in 0..merged.len() {
            if ids1[row] != -999 {
                let (ra, dec) = radecs1[ids1[row] as usize];
                assert_abs_diff_eq!(merged.value(row, "ra").unwrap().as_f64().unwrap(), ra);
                assert_abs_diff_eq!(merged.value(row, "dec").unwrap().as_f64().unwrap(), dec);
            }
        }
    }

    #[test]
    fn one_to_one_prefers_closest_then_first() {
        let pair = |index1, index2, arcsec| MatchedPair {
            index1,
            index2,
            separation: Angle::from_arcseconds(arcsec),
        };
        let unique = one_to_one(
            vec![pair(0, 1, 0.5), pair(1, 1, 0.2), pair(2, 0, 0.3), pair(3, 0, 0.3)],
            2,
        );
        assert_eq!(unique, vec![pair(1, 1, 0.2), pair(2, 0, 0.3)]);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_equals_sequential() {
        let mut rng = rand::thread_rng();
        let radecs = |n: usize, rng: &mut rand::rngs::ThreadRng| {
            (0..n)
                .map(|_| (rng.gen_range(10.0..10.5), rng.gen_range(-0.5..0.5)))
                .collect_vec()
        };
        let a = catalog(&radecs(400, &mut rng), &[]);
        let b = catalog(&radecs(400, &mut rng), &[]);

        let merger = CatalogMerger::new().with_tolerance(Angle::from_arcseconds(30.));
        assert_eq!(merger.merge(&a, &b).unwrap(), merger.merge_par(&a, &b).unwrap());
    }
}
