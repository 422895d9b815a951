//! Nearest-neighbour matching of sky positions and catalog cross-matching.

use std::collections::HashSet;

use kiddo::float::{distance::SquaredEuclidean, kdtree::KdTree};
use log::{debug, info, warn};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use crate::angle::Angle;
use crate::error::{CatalogError, Result};
use crate::geometry::{angular_separation, unit_vector};
use crate::ndarray_utils::{radecs, require_columns};
use crate::table::Catalog;

type SkyTree = KdTree<f64, usize, 3, 32, u32>;

/// Nearest neighbour of a source in another set of sources.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkyMatch {
    /// Row of the neighbour in the second set.
    pub index: usize,
    /// Great-circle distance to the neighbour.
    pub separation: Angle,
}

/// A pair of rows accepted by a [`CrossMatcher`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchedPair {
    /// Row in the first catalog.
    pub index1: usize,
    /// Row in the second catalog.
    pub index2: usize,
    /// Great-circle distance between both rows.
    pub separation: Angle,
}

/// Finds nearest neighbours between two sets of sky positions.
///
/// Positions are arrays of shape `(n, 2)` holding right ascension and declination in degrees.
/// Implementations have to be deterministic and must not apply any tolerance themselves.
pub trait SpatialMatcher {
    /// For every row of `radecs1`, the nearest row of `radecs2` and its separation.
    /// `None` only if `radecs2` is empty.
    fn match_to_catalog(
        &self,
        radecs1: ArrayView2<f64>,
        radecs2: ArrayView2<f64>,
    ) -> Vec<Option<SkyMatch>>;

    /// Same as [`match_to_catalog`](SpatialMatcher::match_to_catalog()), possibly in parallel.
    ///
    /// The result has to be identical to the sequential one.
    #[cfg(feature = "parallel")]
    fn match_to_catalog_par(
        &self,
        radecs1: ArrayView2<f64>,
        radecs2: ArrayView2<f64>,
    ) -> Vec<Option<SkyMatch>> {
        self.match_to_catalog(radecs1, radecs2)
    }
}

/// Matches sky positions with a k-d tree over unit vectors.
///
/// The tree yields the nearest neighbour by chord length, which is monotonic in the
/// angular distance. The reported separation is then computed exactly on the sphere.
#[derive(Clone, Copy, Debug, Default)]
pub struct KdTreeMatcher;

impl KdTreeMatcher {
    /// Tree over the distinct positions of `radecs`, each stored with its first row.
    ///
    /// A leaf can only hold as many identical points as its bucket size, so repeated
    /// positions are inserted once. Their nearest neighbour is the first row either way.
    fn build_tree(radecs: ArrayView2<f64>) -> SkyTree {
        let mut seen = HashSet::with_capacity(radecs.nrows());
        let tree: SkyTree = radecs
            .axis_iter(Axis(0))
            .enumerate()
            .filter_map(|(i, r)| {
                let v = unit_vector(r[0], r[1]);
                let point = [v.x, v.y, v.z];
                // -0.0 + 0.0 is 0.0, so equal coordinates have equal bits.
                seen.insert(point.map(|c| (c + 0.).to_bits()))
                    .then_some((point, i))
            })
            .collect();
        if seen.len() < radecs.nrows() {
            debug!(
                "Skipped {} repeated positions while building the k-d tree.",
                radecs.nrows() - seen.len()
            );
        }
        tree
    }

    fn nearest(tree: &SkyTree, radecs2: ArrayView2<f64>, radec: ArrayView1<f64>) -> SkyMatch {
        let v = unit_vector(radec[0], radec[1]);
        let nearest = tree.nearest_one::<SquaredEuclidean>(&[v.x, v.y, v.z]);
        let index = nearest.item;
        SkyMatch {
            index,
            separation: angular_separation(
                (radec[0], radec[1]),
                (radecs2[[index, 0]], radecs2[[index, 1]]),
            ),
        }
    }

    fn prepare(radecs1: ArrayView2<f64>, radecs2: ArrayView2<f64>) -> Option<SkyTree> {
        if radecs2.nrows() == 0 {
            warn!("Matching against an empty set of sources.");
            return None;
        }
        info!("Building k-d tree over {} sources.", radecs2.nrows());
        let tree = Self::build_tree(radecs2);
        info!(
            "Matching {} against {} sources.",
            radecs1.nrows(),
            radecs2.nrows()
        );
        Some(tree)
    }
}

impl SpatialMatcher for KdTreeMatcher {
    fn match_to_catalog(
        &self,
        radecs1: ArrayView2<f64>,
        radecs2: ArrayView2<f64>,
    ) -> Vec<Option<SkyMatch>> {
        let Some(tree) = Self::prepare(radecs1, radecs2) else {
            return vec![None; radecs1.nrows()];
        };
        radecs1
            .axis_iter(Axis(0))
            .map(|radec| Some(Self::nearest(&tree, radecs2, radec)))
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn match_to_catalog_par(
        &self,
        radecs1: ArrayView2<f64>,
        radecs2: ArrayView2<f64>,
    ) -> Vec<Option<SkyMatch>> {
        use rayon::prelude::*;

        let Some(tree) = Self::prepare(radecs1, radecs2) else {
            return vec![None; radecs1.nrows()];
        };
        radecs1
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|radec| Some(Self::nearest(&tree, radecs2, radec)))
            .collect()
    }
}

/// Cross-matches two catalogs by sky position.
///
/// Construct it with [`CrossMatcher::new()`] and adjust it with the `with_*` functions.
///
/// # Parameters
/// - `tolerance`: Pairs are accepted if their separation is strictly smaller. Default 5".
/// - `columns1`, `columns2`: Names of the right ascension and declination columns
///     of the first and second catalog, both in degrees. Default `("ra", "dec")`.
///
/// # Example:
/// ```
/// # use catmatch::{Angle, Catalog, ColumnData, CrossMatcher};
/// let cat1 = Catalog::from_columns([
///     ("ra", ColumnData::from(vec![10., 50.])),
///     ("dec", ColumnData::from(vec![20., 20.])),
/// ]).unwrap();
/// let cat2 = Catalog::from_columns([
///     ("RAJ2000", ColumnData::from(vec![10.0001])),
///     ("DEJ2000", ColumnData::from(vec![20.])),
/// ]).unwrap();
///
/// let (matched1, matched2) = CrossMatcher::new()
///     .with_tolerance(Angle::from_arcseconds(2.))
///     .with_columns2("RAJ2000", "DEJ2000")
///     .cross_match(&cat1, &cat2)
///     .unwrap();
/// assert_eq!(matched1.len(), 1);
/// assert_eq!(matched2.len(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct CrossMatcher<M: SpatialMatcher = KdTreeMatcher> {
    matcher: M,
    tolerance: Angle,
    columns1: (String, String),
    columns2: (String, String),
}

impl CrossMatcher<KdTreeMatcher> {
    /// Create a cross matcher with default options.
    pub fn new() -> Self {
        Self {
            matcher: KdTreeMatcher,
            tolerance: Angle::from_arcseconds(5.),
            columns1: ("ra".to_owned(), "dec".to_owned()),
            columns2: ("ra".to_owned(), "dec".to_owned()),
        }
    }
}

impl Default for CrossMatcher<KdTreeMatcher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: SpatialMatcher> CrossMatcher<M> {
    /// Use another nearest-neighbour search.
    pub fn with_matcher<N: SpatialMatcher>(self, matcher: N) -> CrossMatcher<N> {
        CrossMatcher {
            matcher,
            tolerance: self.tolerance,
            columns1: self.columns1,
            columns2: self.columns2,
        }
    }

    /// Set the maximum separation of a match.
    pub fn with_tolerance(mut self, tolerance: Angle) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the coordinate columns of both catalogs.
    pub fn with_columns(self, ra: impl Into<String>, dec: impl Into<String>) -> Self {
        let (ra, dec) = (ra.into(), dec.into());
        self.with_columns1(ra.clone(), dec.clone())
            .with_columns2(ra, dec)
    }

    /// Set the coordinate columns of the first catalog.
    pub fn with_columns1(mut self, ra: impl Into<String>, dec: impl Into<String>) -> Self {
        self.columns1 = (ra.into(), dec.into());
        self
    }

    /// Set the coordinate columns of the second catalog.
    pub fn with_columns2(mut self, ra: impl Into<String>, dec: impl Into<String>) -> Self {
        self.columns2 = (ra.into(), dec.into());
        self
    }

    /// Maximum separation of an accepted match.
    pub fn tolerance(&self) -> Angle {
        self.tolerance
    }

    /// Validate options and catalogs and extract the sky positions of both catalogs.
    ///
    /// Missing columns are reported before any coordinate value is looked at.
    pub(crate) fn coordinates(
        &self,
        cat1: &Catalog,
        cat2: &Catalog,
    ) -> Result<(Array2<f64>, Array2<f64>)> {
        if !self.tolerance.is_positive_finite() {
            return Err(CatalogError::InvalidTolerance(self.tolerance.degrees()));
        }
        let (ra1, dec1) = (self.columns1.0.as_str(), self.columns1.1.as_str());
        let (ra2, dec2) = (self.columns2.0.as_str(), self.columns2.1.as_str());
        require_columns(cat1, &[ra1, dec1])?;
        require_columns(cat2, &[ra2, dec2])?;

        Ok((radecs(cat1, ra1, dec1)?, radecs(cat2, ra2, dec2)?))
    }

    /// Accepted pairs between two validated sets of positions, ordered by the first index.
    pub(crate) fn accept(
        &self,
        radecs1: ArrayView2<f64>,
        radecs2: ArrayView2<f64>,
        parallel: bool,
    ) -> Vec<MatchedPair> {
        let raw = self.nearest(radecs1, radecs2, parallel);
        let pairs: Vec<MatchedPair> = raw
            .into_iter()
            .enumerate()
            .filter_map(|(index1, m)| {
                m.filter(|m| m.separation < self.tolerance)
                    .map(|m| MatchedPair {
                        index1,
                        index2: m.index,
                        separation: m.separation,
                    })
            })
            .collect();
        debug!(
            "Accepted {} of {} sources within {}.",
            pairs.len(),
            radecs1.nrows(),
            self.tolerance
        );
        pairs
    }

    #[cfg(feature = "parallel")]
    fn nearest(
        &self,
        radecs1: ArrayView2<f64>,
        radecs2: ArrayView2<f64>,
        parallel: bool,
    ) -> Vec<Option<SkyMatch>> {
        if parallel {
            self.matcher.match_to_catalog_par(radecs1, radecs2)
        } else {
            self.matcher.match_to_catalog(radecs1, radecs2)
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn nearest(
        &self,
        radecs1: ArrayView2<f64>,
        radecs2: ArrayView2<f64>,
        _parallel: bool,
    ) -> Vec<Option<SkyMatch>> {
        self.matcher.match_to_catalog(radecs1, radecs2)
    }

    /// Nearest neighbour in `cat2` of every row of `cat1`, regardless of the tolerance.
    pub fn match_indices(&self, cat1: &Catalog, cat2: &Catalog) -> Result<Vec<Option<SkyMatch>>> {
        let (radecs1, radecs2) = self.coordinates(cat1, cat2)?;
        Ok(self.nearest(radecs1.view(), radecs2.view(), false))
    }

    /// Pairs of rows closer than the tolerance, ordered by their row in `cat1`.
    ///
    /// Several rows of `cat1` may be paired with the same row of `cat2`.
    pub fn matched_pairs(&self, cat1: &Catalog, cat2: &Catalog) -> Result<Vec<MatchedPair>> {
        let (radecs1, radecs2) = self.coordinates(cat1, cat2)?;
        Ok(self.accept(radecs1.view(), radecs2.view(), false))
    }

    /// Rows of both catalogs that were matched to each other.
    ///
    /// The returned catalogs have the same length and are aligned row by row,
    /// in the order the rows appear in `cat1`.
    pub fn cross_match(&self, cat1: &Catalog, cat2: &Catalog) -> Result<(Catalog, Catalog)> {
        let (radecs1, radecs2) = self.coordinates(cat1, cat2)?;
        let pairs = self.accept(radecs1.view(), radecs2.view(), false);
        Ok(Self::split(cat1, cat2, &pairs))
    }

    fn split(cat1: &Catalog, cat2: &Catalog, pairs: &[MatchedPair]) -> (Catalog, Catalog) {
        let (rows1, rows2): (Vec<usize>, Vec<usize>) =
            pairs.iter().map(|p| (p.index1, p.index2)).unzip();
        (cat1.take(&rows1), cat2.take(&rows2))
    }
}

#[cfg(feature = "parallel")]
impl<M: SpatialMatcher> CrossMatcher<M> {
    /// Find the pairs of rows closer than the tolerance, in parallel.
    ///
    /// Also see [`matched_pairs`](CrossMatcher::matched_pairs()) for more details.
    pub fn matched_pairs_par(&self, cat1: &Catalog, cat2: &Catalog) -> Result<Vec<MatchedPair>> {
        let (radecs1, radecs2) = self.coordinates(cat1, cat2)?;
        Ok(self.accept(radecs1.view(), radecs2.view(), true))
    }

    /// Cross-match two catalogs, in parallel.
    ///
    /// Also see [`cross_match`](CrossMatcher::cross_match()) for more details.
    pub fn cross_match_par(&self, cat1: &Catalog, cat2: &Catalog) -> Result<(Catalog, Catalog)> {
        let (radecs1, radecs2) = self.coordinates(cat1, cat2)?;
        let pairs = self.accept(radecs1.view(), radecs2.view(), true);
        Ok(Self::split(cat1, cat2, &pairs))
    }
}

/// Cross-match two catalogs on their `ra`/`dec` columns.
///
/// Shorthand for [`CrossMatcher`] with the given tolerance.
pub fn xmatch_catalogs(
    cat1: &Catalog,
    cat2: &Catalog,
    tolerance: Angle,
) -> Result<(Catalog, Catalog)> {
    CrossMatcher::new()
        .with_tolerance(tolerance)
        .cross_match(cat1, cat2)
}
