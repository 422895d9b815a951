//! Angular quantities.

use std::f64::consts::PI;
use std::fmt;

/// An angle, stored in radians.
///
/// Used for match tolerances and separations so that the unit of a
/// number is never ambiguous at an API boundary.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct Angle {
    rad: f64,
}

impl Angle {
    /// Zero angle.
    pub const ZERO: Self = Self { rad: 0.0 };

    /// Half a circle.
    pub const PI: Self = Self { rad: PI };

    /// Creates an angle from radians.
    pub const fn from_radians(rad: f64) -> Self {
        Self { rad }
    }

    /// Creates an angle from degrees.
    pub fn from_degrees(deg: f64) -> Self {
        Self {
            rad: deg.to_radians(),
        }
    }

    /// Creates an angle from arcminutes.
    pub fn from_arcminutes(arcmin: f64) -> Self {
        Self::from_degrees(arcmin / 60.0)
    }

    /// Creates an angle from arcseconds.
    pub fn from_arcseconds(arcsec: f64) -> Self {
        Self::from_degrees(arcsec / 3600.0)
    }

    /// The angle in radians.
    pub fn radians(&self) -> f64 {
        self.rad
    }

    /// The angle in degrees.
    pub fn degrees(&self) -> f64 {
        self.rad.to_degrees()
    }

    /// The angle in arcminutes.
    pub fn arcminutes(&self) -> f64 {
        self.degrees() * 60.0
    }

    /// The angle in arcseconds.
    pub fn arcseconds(&self) -> f64 {
        self.degrees() * 3600.0
    }

    /// Whether the angle can be used as a match radius.
    pub fn is_positive_finite(&self) -> bool {
        self.rad.is_finite() && self.rad > 0.0
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}\"", self.arcseconds())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn conversions() {
        let angle = Angle::from_arcseconds(3600.);
        assert_abs_diff_eq!(angle.degrees(), 1., epsilon = 1e-12);
        assert_abs_diff_eq!(angle.arcminutes(), 60., epsilon = 1e-9);

        let angle = Angle::from_degrees(180.);
        assert_abs_diff_eq!(angle.radians(), PI, epsilon = 1e-15);

        let angle = Angle::from_arcminutes(1.5);
        assert_abs_diff_eq!(angle.arcseconds(), 90., epsilon = 1e-9);
    }

    #[test]
    fn ordering() {
        assert!(Angle::from_arcseconds(1.) < Angle::from_arcseconds(1.5));
        assert!(Angle::from_arcminutes(1.) > Angle::from_arcseconds(59.));
    }

    #[test]
    fn tolerance_validity() {
        assert!(Angle::from_arcseconds(1.).is_positive_finite());
        assert!(!Angle::ZERO.is_positive_finite());
        assert!(!Angle::from_degrees(-1.).is_positive_finite());
        assert!(!Angle::from_degrees(f64::NAN).is_positive_finite());
        assert!(!Angle::from_degrees(f64::INFINITY).is_positive_finite());
    }

    #[test]
    fn display() {
        assert_eq!(Angle::from_arcseconds(5.).to_string(), "5.000\"");
    }
}
