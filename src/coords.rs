use serde::{Deserialize, Serialize};

/// A point in the scan plane, in mm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Point {
        Point { x, y }
    }

    /// Distance from the optical axis
    pub fn radius(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

/// A point as sent to the scanner. `z` is the focus axis, in mm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Point3 {
        Point3 { x, y, z }
    }

    pub fn xy(&self) -> Point {
        Point {
            x: self.x,
            y: self.y,
        }
    }
}

/// Affine transform of the scan plane.
/// The matrix is stored column-major as `[a, b, c, d, e, f]`, mapping
/// `(x, y)` to `(a*x + c*y + e, b*x + d*y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub matrix: [f64; 6],
}

fn matrix_mul(a: &[f64; 6], b: &[f64; 6]) -> [f64; 6] {
    [
        a[0] * b[0] + a[2] * b[1],
        a[1] * b[0] + a[3] * b[1],
        a[0] * b[2] + a[2] * b[3],
        a[1] * b[2] + a[3] * b[3],
        a[0] * b[4] + a[2] * b[5] + a[4],
        a[1] * b[4] + a[3] * b[5] + a[5],
    ]
}

impl Transform {
    pub fn translate(x: f64, y: f64) -> Transform {
        Transform {
            matrix: [1.0, 0.0, 0.0, 1.0, x, y],
        }
    }

    pub fn scale_xy(sx: f64, sy: f64) -> Transform {
        Transform {
            matrix: [sx, 0.0, 0.0, sy, 0.0, 0.0],
        }
    }

    /// Counter-clockwise rotation around origo
    ///
    /// # Arguments
    /// * `a` - Angle in radians
    pub fn rotate(a: f64) -> Transform {
        let (s, c) = a.sin_cos();
        Transform {
            matrix: [c, s, -s, c, 0.0, 0.0],
        }
    }

    /// Scale, then rotate, then offset. This is the order in which the
    /// scanner head applies its axis calibration.
    pub fn axis(scale: Point, rotate_degrees: f64, offset: Point) -> Transform {
        let t = Transform::translate(offset.x, offset.y);
        if rotate_degrees == 0.0 {
            t * Transform::scale_xy(scale.x, scale.y)
        } else {
            t * Transform::rotate(rotate_degrees.to_radians()) * Transform::scale_xy(scale.x, scale.y)
        }
    }
}

impl std::ops::Mul for Transform {
    type Output = Transform;
    fn mul(self, t: Self) -> Self {
        Transform {
            matrix: matrix_mul(&self.matrix, &t.matrix),
        }
    }
}

impl std::ops::Mul<Point> for Transform {
    type Output = Point;
    fn mul(self, v: Point) -> Point {
        Point {
            x: self.matrix[0] * v.x + self.matrix[2] * v.y + self.matrix[4],
            y: self.matrix[1] * v.x + self.matrix[3] * v.y + self.matrix[5],
        }
    }
}

#[test]
fn test_axis_transform_scale_offset() {
    let t = Transform::axis(Point::new(1.5, 0.5), 0.0, Point::new(2.0, -3.0));
    let p = t * Point::new(10.0, 4.0);
    assert_eq!(p, Point::new(17.0, -1.0));
}

#[test]
fn test_axis_transform_rotation() {
    let t = Transform::axis(Point::new(2.0, 2.0), 90.0, Point::new(1.0, 0.0));
    let p = t * Point::new(1.0, 0.0);
    // (1,0) scaled to (2,0), rotated to (0,2), offset to (1,2)
    assert_abs_diff_eq!(p.x, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(p.y, 2.0, epsilon = 1e-12);
}

#[test]
fn test_point_radius() {
    assert_relative_eq!(Point::new(3.0, -4.0).radius(), 5.0);
    assert_eq!(Point3::new(1.0, 2.0, -0.5).xy(), Point::new(1.0, 2.0));
}
