use crate::calibration::CalibrationModel;
use crate::coords::Point;

/// Focus correction in mm compensating lens field curvature at `(x, y)`.
///
/// Quadratic in the distance from the optical axis: `A*r² + B*r + C`.
/// Zero when curvature correction is disabled.
pub fn correction(x: f64, y: f64, calib: &CalibrationModel) -> f64 {
    if !calib.curvature_enabled {
        return 0.0;
    }
    let r = Point::new(x, y).radius();
    calib.curvature_a * r * r + calib.curvature_b * r + calib.curvature_c
}

#[cfg(test)]
use crate::calibration::test_calibration;

#[cfg(test)]
fn curved() -> CalibrationModel {
    CalibrationModel {
        curvature_enabled: true,
        curvature_a: 1.2e-4,
        curvature_b: -3.0e-3,
        curvature_c: 0.05,
        ..test_calibration()
    }
}

#[test]
fn test_disabled() {
    let calib = CalibrationModel {
        curvature_enabled: false,
        ..curved()
    };
    assert_eq!(correction(100.0, -20.0, &calib), 0.0);
}

#[test]
fn test_quadratic() {
    let calib = curved();
    assert_relative_eq!(correction(0.0, 0.0, &calib), 0.05);
    // r = 50
    assert_relative_eq!(
        correction(30.0, 40.0, &calib),
        1.2e-4 * 2500.0 - 3.0e-3 * 50.0 + 0.05,
        max_relative = 1e-12
    );
}

#[test]
fn test_symmetry() {
    let calib = curved();
    for i in -20..20 {
        for j in -20..20 {
            let (x, y) = (i as f64 * 7.3, j as f64 * 4.1);
            let c = correction(x, y, &calib);
            assert_eq!(c, correction(-x, -y, &calib));
            assert_eq!(c, correction(y, x, &calib));
            assert_eq!(c, correction(-y, x, &calib));
        }
    }
}
