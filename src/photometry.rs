//! Conversions between magnitudes and fluxes of photometric catalogs.
//!
//! Magnitude columns are recognised by their filter name, e.g. `DES_r` with the
//! uncertainty in `DES_r_err`. Fluxes are in Jansky unless a [`FluxUnit`] says otherwise.

use std::f64::consts::LN_10;
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use log::{debug, info};
use ndarray::{Array1, ArrayView1, Zip};

use crate::error::{CatalogError, Result};
use crate::table::{Catalog, ColumnData, ColumnKind};

/// Zero point of the AB magnitude system in Jansky.
pub const AB_ZERO_POINT_JY: f64 = 3630.7805;

/// Flag of values that could not be converted, e.g. non-detections.
pub const BAD_VALUE: f64 = -99.;

/// Magnitude uncertainty that marks a magnitude as an upper limit.
pub const UPPER_LIMIT_ERR: f64 = 999.;

/// Magnitudes below this are flags rather than measurements.
const MIN_VALID_MAG: f64 = -10.;

/// Filters whose magnitude columns are converted by [`convert_mags_to_flux`].
pub const VALID_FILTERS: &[&str] = &[
    "GALEX_FUV", "GALEX_NUV",
    "SDSS_u", "SDSS_g", "SDSS_r", "SDSS_i", "SDSS_z",
    "DES_g", "DES_r", "DES_i", "DES_z", "DES_Y",
    "DELVE_g", "DELVE_r", "DELVE_i", "DELVE_z",
    "Pan-STARRS_g", "Pan-STARRS_r", "Pan-STARRS_i", "Pan-STARRS_z", "Pan-STARRS_y",
    "LS_g", "LS_r", "LS_z",
    "HSC_g", "HSC_r", "HSC_i", "HSC_z", "HSC_Y",
    "2MASS_J", "2MASS_H", "2MASS_K",
    "VISTA_Y", "VISTA_J", "VISTA_H", "VISTA_Ks",
    "UKIDSS_Y", "UKIDSS_J", "UKIDSS_H", "UKIDSS_K",
    "WISE_W1", "WISE_W2", "WISE_W3", "WISE_W4",
    "Spitzer_3.6", "Spitzer_4.5",
];

/// Vega zero points of the VISTA bands in Jansky.
fn vista_zero_point(filter: &str) -> Option<f64> {
    match filter {
        "VISTA_Y" => Some(2087.32),
        "VISTA_J" => Some(1554.03),
        "VISTA_H" => Some(1030.40),
        "VISTA_Ks" => Some(674.83),
        _ => None,
    }
}

/// Unit of converted fluxes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FluxUnit {
    /// Jansky (`Jy`).
    Jansky,
    /// Millijansky (`mJy`), the default.
    #[default]
    MilliJansky,
    /// Microjansky (`uJy`).
    MicroJansky,
}

impl FluxUnit {
    /// Number of this unit in one Jansky.
    pub fn per_jansky(self) -> f64 {
        match self {
            FluxUnit::Jansky => 1.,
            FluxUnit::MilliJansky => 1e3,
            FluxUnit::MicroJansky => 1e6,
        }
    }
}

impl fmt::Display for FluxUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FluxUnit::Jansky => "Jy",
            FluxUnit::MilliJansky => "mJy",
            FluxUnit::MicroJansky => "uJy",
        })
    }
}

impl FromStr for FluxUnit {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Jy" => Ok(FluxUnit::Jansky),
            "mJy" => Ok(FluxUnit::MilliJansky),
            "uJy" | "µJy" => Ok(FluxUnit::MicroJansky),
            _ => Err(CatalogError::invalid_configuration(format!(
                "unknown flux unit '{s}'"
            ))),
        }
    }
}

/// AB magnitude of a flux in Jansky, and its uncertainty if the flux uncertainty is given.
///
/// # Example:
/// ```
/// # use catmatch::mag_from_flux;
/// let (mag, err) = mag_from_flux(3631e-6, Some(3631e-7));
/// assert!((mag - 15.).abs() < 1e-3);
/// assert!((err.unwrap() - 0.1086).abs() < 1e-4);
/// ```
pub fn mag_from_flux(flux_jy: f64, flux_err_jy: Option<f64>) -> (f64, Option<f64>) {
    let mag = -2.5 * flux_jy.log10() + 8.9;
    let err = flux_err_jy.map(|err| (2.5 / LN_10 * err / flux_jy).abs());
    (mag, err)
}

/// Flux in Jansky of a single magnitude, or [`BAD_VALUE`] for flagged magnitudes.
fn mag_to_flux(mag: f64, zpt_flux_jy: f64) -> f64 {
    if mag < MIN_VALID_MAG {
        BAD_VALUE
    } else {
        zpt_flux_jy * 10f64.powf(-mag / 2.5)
    }
}

/// Flux uncertainty in Jansky of a single magnitude uncertainty.
///
/// Negative uncertainties, upper limits and flagged fluxes give [`BAD_VALUE`].
fn mag_err_to_flux_err(flux_jy: f64, mag_err: f64) -> f64 {
    if mag_err < 0. || mag_err == UPPER_LIMIT_ERR || flux_jy == BAD_VALUE {
        BAD_VALUE
    } else {
        flux_jy * (10f64.powf(mag_err / 2.5) - 1.)
    }
}

fn validate_zero_point(zpt_flux_jy: f64) -> Result<()> {
    if zpt_flux_jy.is_finite() && zpt_flux_jy > 0. {
        Ok(())
    } else {
        Err(CatalogError::invalid_configuration(format!(
            "zero point flux has to be positive and finite, got {zpt_flux_jy} Jy"
        )))
    }
}

/// Fluxes in Jansky of magnitudes relative to the zero point flux `zpt_flux_jy`,
/// e.g. [`AB_ZERO_POINT_JY`].
///
/// Magnitudes below -10 are treated as flags and converted to [`BAD_VALUE`], as are
/// uncertainties that are negative or equal to [`UPPER_LIMIT_ERR`].
pub fn mags_to_flux(
    mags: ArrayView1<f64>,
    zpt_flux_jy: f64,
    mag_errs: Option<ArrayView1<f64>>,
) -> Result<(Array1<f64>, Option<Array1<f64>>)> {
    validate_zero_point(zpt_flux_jy)?;
    if let Some(errs) = mag_errs {
        if errs.len() != mags.len() {
            return Err(CatalogError::LengthMismatch {
                column: "mag_err".to_owned(),
                expected: mags.len(),
                actual: errs.len(),
            });
        }
    }

    let fluxes = mags.mapv(|mag| mag_to_flux(mag, zpt_flux_jy));
    let errs = mag_errs.map(|errs| {
        Zip::from(&fluxes)
            .and(errs)
            .map_collect(|&flux, &err| mag_err_to_flux_err(flux, err))
    });
    Ok((fluxes, errs))
}

/// Magnitude columns and their uncertainty columns present in the catalog.
///
/// Both lists follow the order of `filters`, usually [`VALID_FILTERS`].
pub fn detect_mag_cols(catalog: &Catalog, filters: &[&str]) -> (Vec<String>, Vec<String>) {
    let mags = filters
        .iter()
        .filter(|f| catalog.contains(f))
        .map(|f| f.to_string())
        .collect_vec();
    let errs = filters
        .iter()
        .map(|f| format!("{f}_err"))
        .filter(|e| catalog.contains(e))
        .collect_vec();
    (mags, errs)
}

/// Copy of the catalog with all magnitudes of [`VALID_FILTERS`] converted to fluxes.
///
/// VISTA bands are Vega magnitudes, all others AB. Flagged values stay [`BAD_VALUE`]
/// and are not scaled. Upper limits keep their flux and get the uncertainty [`BAD_VALUE`].
/// Masked cells stay masked, and so does the uncertainty of a masked magnitude.
pub fn convert_mags_to_flux(catalog: &Catalog, unit: FluxUnit) -> Result<Catalog> {
    let (mag_cols, err_cols) = detect_mag_cols(catalog, VALID_FILTERS);
    info!(
        "Converting {} magnitude columns to {unit}.",
        mag_cols.len()
    );

    let scale = |value: f64| {
        if value == BAD_VALUE {
            value
        } else {
            value * unit.per_jansky()
        }
    };

    let mut converted = catalog.clone();
    for mag_col in &mag_cols {
        let zpt = vista_zero_point(mag_col).unwrap_or(AB_ZERO_POINT_JY);
        let mags = numeric_column(catalog, mag_col)?;
        let fluxes = mags
            .iter()
            .map(|mag| mag.map(|mag| mag_to_flux(mag, zpt)))
            .collect_vec();

        let err_col = format!("{mag_col}_err");
        if err_cols.contains(&err_col) {
            let errs = numeric_column(catalog, &err_col)?;
            let flux_errs = fluxes
                .iter()
                .zip(errs)
                .map(|(flux, err)| match (flux, err) {
                    (Some(flux), Some(err)) => Some(scale(mag_err_to_flux_err(*flux, err))),
                    _ => None,
                })
                .collect_vec();
            converted.replace_column(&err_col, ColumnData::Float(flux_errs))?;
            converted.set_unit(&err_col, unit.to_string())?;
        } else {
            debug!("No uncertainties for '{mag_col}'.");
        }

        let fluxes = fluxes.into_iter().map(|f| f.map(scale)).collect_vec();
        converted.replace_column(mag_col, ColumnData::Float(fluxes))?;
        converted.set_unit(mag_col, unit.to_string())?;
    }
    Ok(converted)
}

fn numeric_column(catalog: &Catalog, name: &str) -> Result<Vec<Option<f64>>> {
    let column = catalog.column(name)?;
    column.to_f64().ok_or_else(|| CatalogError::TypeMismatch {
        column: name.to_owned(),
        expected: ColumnKind::Float,
        actual: column.kind(),
    })
}
