//! Per-point coordinate correction.
//!
//! Maps region geometry from job coordinates into scanner coordinates:
//! XY through the axis scale, rotation and offset of the head, Z as the
//! region's focus offset plus field curvature plus the head's Z offset.

use crate::calibration::CalibrationModel;
use crate::coords::{Point, Point3, Transform};
use crate::field_curvature;

/// Transform of one scanner head, built once and applied to every point
pub struct AxisTransform<'a> {
    calib: &'a CalibrationModel,
    xy: Transform,
}

impl<'a> AxisTransform<'a> {
    pub fn new(calib: &'a CalibrationModel) -> AxisTransform<'a> {
        AxisTransform {
            calib,
            xy: Transform::axis(
                calib.axis_scale(),
                calib.axis_rotate_degrees,
                calib.axis_offset(),
            ),
        }
    }

    /// Scanner position for `p` in a region focused at `focus_z`.
    ///
    /// # Arguments
    /// * `p` - Job coordinates, mm. `p.z` is an extra Z offset requested by
    ///   the caller and is scaled by the head's Z scale; normally 0.
    /// * `focus_z` - Focus offset of the region, mm
    pub fn apply(&self, p: Point3, focus_z: f64) -> Point3 {
        let field = field_curvature::correction(p.x, p.y, self.calib);
        let z = p.z * self.calib.axis_scale_z + focus_z + field + self.calib.axis_offset_z;
        let xy = self.xy * p.xy();
        Point3::new(xy.x, xy.y, z)
    }

    /// Transform a whole polyline. Point order and count are kept.
    pub fn apply_polyline(&self, points: &[Point], focus_z: f64) -> Vec<Point3> {
        points
            .iter()
            .map(|p| self.apply(Point3::new(p.x, p.y, 0.0), focus_z))
            .collect()
    }
}

/// Transform a single polyline with a freshly built head transform
pub fn transform_geometry(points: &[Point], focus_z: f64, calib: &CalibrationModel) -> Vec<Point3> {
    AxisTransform::new(calib).apply_polyline(points, focus_z)
}

#[cfg(test)]
use crate::calibration::test_calibration;

#[cfg(test)]
fn head() -> CalibrationModel {
    CalibrationModel {
        curvature_enabled: true,
        curvature_a: 1.0e-4,
        curvature_b: 0.0,
        curvature_c: 0.02,
        axis_offset_x: 1.5,
        axis_offset_y: -2.0,
        axis_offset_z: 0.25,
        axis_scale_x: 1.01,
        axis_scale_y: 0.99,
        axis_scale_z: 2.0,
        ..test_calibration()
    }
}

#[test]
fn test_point() {
    let calib = head();
    let t = AxisTransform::new(&calib);
    let p = t.apply(Point3::new(30.0, 40.0, 0.0), -1.2);
    assert_relative_eq!(p.x, 30.0 * 1.01 + 1.5, max_relative = 1e-12);
    assert_relative_eq!(p.y, 40.0 * 0.99 - 2.0, max_relative = 1e-12);
    // r = 50
    assert_relative_eq!(p.z, -1.2 + 0.25 + 0.02 + 0.25, max_relative = 1e-12);
}

#[test]
fn test_input_z_scaled() {
    let calib = head();
    let t = AxisTransform::new(&calib);
    let base = t.apply(Point3::new(0.0, 0.0, 0.0), 0.0);
    let raised = t.apply(Point3::new(0.0, 0.0, 0.5), 0.0);
    assert_relative_eq!(raised.z - base.z, 1.0, max_relative = 1e-12);
}

#[test]
fn test_polyline_order() {
    let calib = head();
    let points: Vec<Point> = (0..50)
        .map(|i| Point::new(i as f64, -(i as f64) * 0.5))
        .collect();
    let out = transform_geometry(&points, 0.3, &calib);
    assert_eq!(out.len(), points.len());
    for (p, q) in points.iter().zip(&out) {
        assert_relative_eq!(q.x, p.x * 1.01 + 1.5, max_relative = 1e-12);
        assert_relative_eq!(q.y, p.y * 0.99 - 2.0, max_relative = 1e-12);
    }
    assert!(transform_geometry(&[], 0.3, &calib).is_empty());
}

#[test]
fn test_non_finite_propagates() {
    let calib = head();
    let out = transform_geometry(&[Point::new(f64::NAN, 1.0)], 0.0, &calib);
    assert_eq!(out.len(), 1);
    assert!(out[0].x.is_nan());
    assert!(out[0].z.is_nan());
}
