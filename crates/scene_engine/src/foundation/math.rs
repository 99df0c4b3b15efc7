//! Math utilities and types
//!
//! Provides the fundamental math types for the scene-graph core. Everything is
//! `f32` and right-handed Y-up.

pub use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = nalgebra::UnitQuaternion<f32>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

/// Convert a rotation stored as Euler angles in degrees (X, Y, Z) to a
/// quaternion. Applied as `Rz * Ry * Rx`, matching [`Quat::from_euler_angles`].
pub fn euler_degrees_to_quat(euler: Vec3) -> Quat {
    Quat::from_euler_angles(
        euler.x * constants::DEG_TO_RAD,
        euler.y * constants::DEG_TO_RAD,
        euler.z * constants::DEG_TO_RAD,
    )
}

/// Extract Euler angles in degrees (X, Y, Z) from a quaternion.
pub fn quat_to_euler_degrees(rotation: &Quat) -> Vec3 {
    let (roll, pitch, yaw) = rotation.euler_angles();
    Vec3::new(
        roll * constants::RAD_TO_DEG,
        pitch * constants::RAD_TO_DEG,
        yaw * constants::RAD_TO_DEG,
    )
}

/// Position, rotation, and scale of a single node, decoupled from the
/// hierarchy. The cached-matrix machinery in `scene::transform` composes and
/// decomposes through this type.
#[derive(Debug, Clone, PartialEq)]
pub struct Trs {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Trs {
    /// Convert to a transformation matrix (scale, then rotate, then translate)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Decompose a transformation matrix into position, rotation, and scale.
    ///
    /// Scale is recovered from basis-column lengths, so reflections and shear
    /// do not round-trip. Matches the composition order of [`Self::to_matrix`].
    pub fn from_matrix(matrix: Mat4) -> Self {
        let position = Vec3::new(matrix.m14, matrix.m24, matrix.m34);

        let scale_x = Vec3::new(matrix.m11, matrix.m21, matrix.m31).magnitude();
        let scale_y = Vec3::new(matrix.m12, matrix.m22, matrix.m32).magnitude();
        let scale_z = Vec3::new(matrix.m13, matrix.m23, matrix.m33).magnitude();
        let scale = Vec3::new(scale_x, scale_y, scale_z);

        let rotation_matrix = Matrix3::new(
            matrix.m11 / scale_x,
            matrix.m12 / scale_y,
            matrix.m13 / scale_z,
            matrix.m21 / scale_x,
            matrix.m22 / scale_y,
            matrix.m23 / scale_z,
            matrix.m31 / scale_x,
            matrix.m32 / scale_y,
            matrix.m33 / scale_z,
        );
        let rotation = Quat::from_matrix(&rotation_matrix);

        Self {
            position,
            rotation,
            scale,
        }
    }
}
