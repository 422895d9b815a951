use nalgebra::Vector3;

use crate::angle::Angle;

/// Unit vector pointing to a sky position given in degrees.
pub(crate) fn unit_vector(ra: f64, dec: f64) -> Vector3<f64> {
    let (sin_ra, cos_ra) = ra.to_radians().sin_cos();
    let (sin_dec, cos_dec) = dec.to_radians().sin_cos();
    Vector3::new(cos_dec * cos_ra, cos_dec * sin_ra, sin_dec)
}

/// Great-circle distance between two sky positions given in degrees.
///
/// Uses the Vincenty formula, which is accurate at all separations.
///
/// # Example:
/// ```
/// # use catmatch::angular_separation;
/// let sep = angular_separation((0., 0.), (90., 0.));
/// assert!((sep.degrees() - 90.).abs() < 1e-12);
/// ```
pub fn angular_separation(radec1: (f64, f64), radec2: (f64, f64)) -> Angle {
    let (sin_dec1, cos_dec1) = radec1.1.to_radians().sin_cos();
    let (sin_dec2, cos_dec2) = radec2.1.to_radians().sin_cos();
    let (sin_dra, cos_dra) = (radec2.0 - radec1.0).to_radians().sin_cos();

    let num = ((cos_dec2 * sin_dra).powi(2)
        + (cos_dec1 * sin_dec2 - sin_dec1 * cos_dec2 * cos_dra).powi(2))
    .sqrt();
    let den = sin_dec1 * sin_dec2 + cos_dec1 * cos_dec2 * cos_dra;

    Angle::from_radians(num.atan2(den))
}
