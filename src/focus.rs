//! Beam diameter to focus offset conversion.
//!
//! The focus law is linear: every 10 µm of diameter away from the nominal
//! diameter moves the focus by `focus_coefficient` mm. No range checks are
//! made here; a diameter far from nominal simply gives a large offset.

use crate::calibration::CalibrationModel;
use crate::error::{Error, Result};

/// Z offset in mm giving a spot of `diameter_microns`
pub fn diameter_to_z(diameter_microns: f64, calib: &CalibrationModel) -> f64 {
    (diameter_microns - calib.nominal_diameter_microns) / 10.0 * calib.focus_coefficient
}

/// Spot diameter in µm produced by focus offset `z` (mm).
/// Inverse of [`diameter_to_z`].
pub fn z_to_diameter(z: f64, calib: &CalibrationModel) -> Result<f64> {
    if calib.focus_coefficient == 0.0 {
        return Err(Error::DivisionByZero {
            field: "focusCoefficient",
        });
    }
    Ok(z / calib.focus_coefficient * 10.0 + calib.nominal_diameter_microns)
}

#[cfg(test)]
use crate::calibration::test_calibration;

#[test]
fn test_diameter_to_z() {
    let calib = test_calibration();
    assert_relative_eq!(diameter_to_z(80.0, &calib), -1.2, max_relative = 1e-12);
    assert_eq!(diameter_to_z(120.0, &calib), 0.0);
    assert_relative_eq!(diameter_to_z(220.0, &calib), 3.0, max_relative = 1e-12);
}

#[test]
fn test_round_trip() {
    let calib = test_calibration();
    for i in -1000..1000 {
        let d = i as f64 * 0.731;
        let z = diameter_to_z(d, &calib);
        assert_abs_diff_eq!(z_to_diameter(z, &calib).unwrap(), d, epsilon = 1e-6);
    }
    let calib = CalibrationModel {
        focus_coefficient: -0.017,
        nominal_diameter_microns: 63.0,
        ..test_calibration()
    };
    for &d in &[0.0, 63.0, 1e-3, 5000.0, -40.0] {
        let z = diameter_to_z(d, &calib);
        assert_abs_diff_eq!(z_to_diameter(z, &calib).unwrap(), d, epsilon = 1e-6);
    }
}

#[test]
fn test_zero_coefficient() {
    let calib = CalibrationModel {
        focus_coefficient: 0.0,
        ..test_calibration()
    };
    assert_eq!(diameter_to_z(80.0, &calib), 0.0);
    match z_to_diameter(1.0, &calib) {
        Err(Error::DivisionByZero { field }) => assert_eq!(field, "focusCoefficient"),
        r => panic!("unexpected {:?}", r),
    }
}
