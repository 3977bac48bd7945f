//! World-space geometry helpers shared by every rig builder.
//!
//! Rotations follow the XYZ rotate order of the authoring host: a node's
//! Euler triple `(x, y, z)` applies X first, then Y, then Z.

use nalgebra::{Isometry3, Matrix3, Matrix4, Point3, Translation3, UnitQuaternion, Vector3};

use crate::error::RigError;
use crate::types::Axis;

/// Euclidean distance between two world-space positions.
pub fn distance(a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    nalgebra::distance(a, b)
}

/// Resolve a signed axis label (`X`, `-Y`, ...) to its unit vector.
pub fn axis_vector(spec: &str) -> Result<Vector3<f64>, RigError> {
    spec.parse::<Axis>().map(Axis::vector)
}

/// Result of resetting a transform to the origin.
///
/// `transform` is what the node's channels hold afterwards; `delta` is the
/// transform that was frozen into its geometry and must be re-applied to
/// anything expressed in the node's old local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResetToOrigin {
    pub transform: Isometry3<f64>,
    pub delta: Isometry3<f64>,
}

/// Zero a transform's translation and rotation, freezing the old value.
pub fn reset_to_origin(world: &Isometry3<f64>) -> ResetToOrigin {
    ResetToOrigin {
        transform: Isometry3::identity(),
        delta: *world,
    }
}

/// Rotation from XYZ Euler angles in degrees.
pub fn rotation_from_euler_degrees(degrees: [f64; 3]) -> UnitQuaternion<f64> {
    UnitQuaternion::from_euler_angles(
        degrees[0].to_radians(),
        degrees[1].to_radians(),
        degrees[2].to_radians(),
    )
}

/// XYZ Euler angles in degrees of a rotation.
pub fn euler_degrees(rotation: &UnitQuaternion<f64>) -> [f64; 3] {
    let (x, y, z) = rotation.euler_angles();
    [x.to_degrees(), y.to_degrees(), z.to_degrees()]
}

/// Rigid part of a homogeneous matrix. Scale and shear are discarded.
pub fn isometry_from_matrix(m: &Matrix4<f64>) -> Isometry3<f64> {
    let basis: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
    Isometry3::from_parts(
        Translation3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]),
        UnitQuaternion::from_matrix(&basis),
    )
}

/// Linear interpolation: `a` at `t = 0`, `b` at `t = 1`.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
