#![warn(missing_docs)]

//! Cross-matching and merging of astronomical source catalogs. \
//! Two catalogs of sky positions are matched by nearest neighbour on the sphere, and
//! the matched and unmatched rows are combined into a single catalog in which every input
//! row appears exactly once. Some helpers for cleaning survey query results and converting
//! photometry are included as well.
//!
//! ## Interface
//! The central structs of this library are [`CrossMatcher`] and [`CatalogMerger`].
//! Both are created with `new()`, and additional parameters are set via `with_*()` functions.
//! Catalogs are held in a column-oriented [`Catalog`] with masked cells.
//!
//! Example:
//! ```rust
//! # use catmatch::{Angle, Catalog, CatalogMerger, ColumnData};
//! let des = Catalog::from_columns([
//!     ("ra", ColumnData::from(vec![10., 11.])),
//!     ("dec", ColumnData::from(vec![20., 21.])),
//!     ("mag", ColumnData::from(vec![21.2, 19.4])),
//! ]).unwrap();
//! let wise = Catalog::from_columns([
//!     ("ra", ColumnData::from(vec![10.0001])),
//!     ("dec", ColumnData::from(vec![20.])),
//!     ("mag", ColumnData::from(vec![15.1])),
//! ]).unwrap();
//!
//! let merged = CatalogMerger::new()
//!     .with_tolerance(Angle::from_arcseconds(2.))
//!     .with_table_names("DES", "WISE")
//!     .merge(&des, &wise)
//!     .unwrap();
//! assert_eq!(merged.len(), 2);
//! assert!(merged.contains("mag_DES") && merged.contains("mag_WISE"));
//! ```
//!
//! Cells without a counterpart in the merged catalog hold [`SENTINEL`], or stay masked
//! with [`CatalogMerger::merge_unfilled()`]. The matching can also be executed in parallel.
//!
//! ## Parameters
//! - `tolerance`: Maximum angular separation of a match.
//!     Pairs at exactly the tolerance are rejected.
//!     Defaults to 5" for [`CrossMatcher`] and 1" for [`CatalogMerger`].
//! - `table_names`: Suffixes for columns present in both catalogs, e.g. `flux_1` and `flux_2`.
//!
//! ## Features
//! - `parallel` (default): nearest-neighbour queries with [rayon](https://docs.rs/rayon),
//!     exposed as the `*_par()` functions.

pub mod angle;
pub mod cleaning;
pub mod error;
pub(crate) mod geometry;
pub mod matching;
pub mod merge;
pub(crate) mod ndarray_utils;
pub mod photometry;
pub mod table;

pub use angle::Angle;
pub use cleaning::{
    clean_cat, clean_heasarc, match_ids, remove_duplicates, sort_by_separation, summarize_catalog,
};
pub use error::{CatalogError, Result};
pub use geometry::angular_separation;
pub use matching::{
    CrossMatcher, KdTreeMatcher, MatchedPair, SkyMatch, SpatialMatcher, xmatch_catalogs,
};
pub use merge::{CatalogMerger, xmatch_and_merge_cats};
pub use photometry::{
    FluxUnit, convert_mags_to_flux, detect_mag_cols, mag_from_flux, mags_to_flux,
};
pub use table::{Catalog, ColumnData, ColumnKind, Field, SENTINEL, Schema, Value};
