use std::ops::Mul;

/// Fast mathematical operations using SIMD-accelerated `glam` types.
///
/// This module re-exports all types and functions from the [`glam`] crate.
///
/// # Examples
///
/// ```
/// use onyx_core::math::{Vec2, Vec3, Mat4};
///
/// let position = Vec2::new(10.0, 20.0);
/// let moved = position + Vec2::new(1.0, 0.5) * 0.016;
///
/// let transform = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0));
/// ```
///
/// [`glam`]: https://docs.rs/glam
pub mod fast {
    pub use glam::*;
}

pub use fast::*;

/// An affine transform of a fixed dimension.
///
/// Implemented for [`Mat3`] (2D, homogeneous) and [`Mat4`] (3D, homogeneous).
///
/// *Extrinsic* operations apply in world space and pre-multiply (`op * self`).
/// *Intrinsic* operations apply in the local frame of the transform and post-multiply (`self * op`).
///
/// ```
/// use onyx_core::math::{AffineTransform, Mat3, Vec2};
///
/// let mut m = Mat3::IDENTITY;
/// m.scale_extrinsic(Vec2::splat(2.0));
/// m.translate_extrinsic(Vec2::new(1.0, 0.0));
/// assert_eq!(m.translation(), Vec2::new(1.0, 0.0));
///
/// let mut n = Mat3::IDENTITY;
/// n.scale_extrinsic(Vec2::splat(2.0));
/// n.translate_intrinsic(Vec2::new(1.0, 0.0));
/// assert_eq!(n.translation(), Vec2::new(2.0, 0.0));
/// ```
pub trait AffineTransform: Copy + PartialEq + std::fmt::Debug + Mul<Output = Self> {
    /// Translation and scale vector type.
    type Vector: Copy + PartialEq + std::fmt::Debug;
    /// Rotation representation: an angle in radians for 2D, a quaternion for 3D.
    type Rotation: Copy + std::fmt::Debug;

    /// Number of spatial axes.
    const AXES: usize;
    const IDENTITY_TRANSFORM: Self;

    fn from_translation_vector(translation: Self::Vector) -> Self;
    fn from_scale_vector(scale: Self::Vector) -> Self;
    fn from_rotation(rotation: Self::Rotation) -> Self;

    /// Builds `T * R * S`.
    fn from_trs(translation: Self::Vector, scale: Self::Vector, rotation: Self::Rotation) -> Self {
        Self::from_translation_vector(translation)
            * Self::from_rotation(rotation)
            * Self::from_scale_vector(scale)
    }

    fn splat_vector(value: f32) -> Self::Vector;

    fn translation(&self) -> Self::Vector;
    fn set_translation(&mut self, translation: Self::Vector);
    /// Overwrites a single component of the translation column.
    fn set_translation_axis(&mut self, axis: usize, value: f32);

    /// Scales a single world axis, leaving the others untouched.
    fn scale_axis_extrinsic(&mut self, axis: usize, factor: f32);
    /// Translates along a single world axis.
    fn translate_axis_extrinsic(&mut self, axis: usize, offset: f32);

    fn translate_extrinsic(&mut self, translation: Self::Vector) {
        *self = Self::from_translation_vector(translation) * *self;
    }

    fn translate_intrinsic(&mut self, translation: Self::Vector) {
        *self = *self * Self::from_translation_vector(translation);
    }

    fn scale_extrinsic(&mut self, scale: Self::Vector) {
        *self = Self::from_scale_vector(scale) * *self;
    }

    fn scale_intrinsic(&mut self, scale: Self::Vector) {
        *self = *self * Self::from_scale_vector(scale);
    }

    fn rotate_extrinsic(&mut self, rotation: Self::Rotation) {
        *self = Self::from_rotation(rotation) * *self;
    }

    fn rotate_intrinsic(&mut self, rotation: Self::Rotation) {
        *self = *self * Self::from_rotation(rotation);
    }
}

impl AffineTransform for Mat3 {
    type Vector = Vec2;
    type Rotation = f32;

    const AXES: usize = 2;
    const IDENTITY_TRANSFORM: Self = Mat3::IDENTITY;

    fn from_translation_vector(translation: Vec2) -> Self {
        Mat3::from_translation(translation)
    }

    fn from_scale_vector(scale: Vec2) -> Self {
        Mat3::from_scale(scale)
    }

    fn from_rotation(angle: f32) -> Self {
        Mat3::from_angle(angle)
    }

    fn splat_vector(value: f32) -> Vec2 {
        Vec2::splat(value)
    }

    fn translation(&self) -> Vec2 {
        self.z_axis.truncate()
    }

    fn set_translation(&mut self, translation: Vec2) {
        self.z_axis = translation.extend(1.0);
    }

    fn set_translation_axis(&mut self, axis: usize, value: f32) {
        assert!(axis < Self::AXES, "Axis {axis} out of range for a 2D transform");
        self.z_axis[axis] = value;
    }

    fn scale_axis_extrinsic(&mut self, axis: usize, factor: f32) {
        assert!(axis < Self::AXES, "Axis {axis} out of range for a 2D transform");
        self.x_axis[axis] *= factor;
        self.y_axis[axis] *= factor;
        self.z_axis[axis] *= factor;
    }

    fn translate_axis_extrinsic(&mut self, axis: usize, offset: f32) {
        assert!(axis < Self::AXES, "Axis {axis} out of range for a 2D transform");
        self.z_axis[axis] += offset;
    }
}

impl AffineTransform for Mat4 {
    type Vector = Vec3;
    type Rotation = Quat;

    const AXES: usize = 3;
    const IDENTITY_TRANSFORM: Self = Mat4::IDENTITY;

    fn from_translation_vector(translation: Vec3) -> Self {
        Mat4::from_translation(translation)
    }

    fn from_scale_vector(scale: Vec3) -> Self {
        Mat4::from_scale(scale)
    }

    fn from_rotation(rotation: Quat) -> Self {
        Mat4::from_quat(rotation)
    }

    fn splat_vector(value: f32) -> Vec3 {
        Vec3::splat(value)
    }

    fn translation(&self) -> Vec3 {
        self.w_axis.truncate()
    }

    fn set_translation(&mut self, translation: Vec3) {
        self.w_axis = translation.extend(1.0);
    }

    fn set_translation_axis(&mut self, axis: usize, value: f32) {
        assert!(axis < Self::AXES, "Axis {axis} out of range for a 3D transform");
        self.w_axis[axis] = value;
    }

    fn scale_axis_extrinsic(&mut self, axis: usize, factor: f32) {
        assert!(axis < Self::AXES, "Axis {axis} out of range for a 3D transform");
        self.x_axis[axis] *= factor;
        self.y_axis[axis] *= factor;
        self.z_axis[axis] *= factor;
        self.w_axis[axis] *= factor;
    }

    fn translate_axis_extrinsic(&mut self, axis: usize, offset: f32) {
        assert!(axis < Self::AXES, "Axis {axis} out of range for a 3D transform");
        self.w_axis[axis] += offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_extrinsic_vs_intrinsic_translation() {
        let mut extrinsic = Mat3::from_angle(FRAC_PI_2);
        extrinsic.translate_extrinsic(Vec2::new(1.0, 0.0));
        assert!(extrinsic.translation().abs_diff_eq(Vec2::new(1.0, 0.0), 1e-6));

        let mut intrinsic = Mat3::from_angle(FRAC_PI_2);
        intrinsic.translate_intrinsic(Vec2::new(1.0, 0.0));
        assert!(intrinsic.translation().abs_diff_eq(Vec2::new(0.0, 1.0), 1e-6));
    }

    #[test]
    fn test_from_trs_matches_glam() {
        let t = Vec3::new(1.0, 2.0, 3.0);
        let s = Vec3::new(2.0, 3.0, 4.0);
        let r = Quat::from_rotation_y(0.3);
        let m = Mat4::from_trs(t, s, r);
        assert!(m.abs_diff_eq(Mat4::from_scale_rotation_translation(s, r, t), 1e-5));
    }

    #[test]
    fn test_axis_operations() {
        let mut m = Mat4::IDENTITY;
        m.translate_axis_extrinsic(2, 5.0);
        m.set_translation_axis(0, -1.0);
        assert_eq!(m.translation(), Vec3::new(-1.0, 0.0, 5.0));

        m.scale_axis_extrinsic(2, 2.0);
        assert_eq!(m.translation(), Vec3::new(-1.0, 0.0, 10.0));
        assert_eq!(m.z_axis.z, 2.0);
        assert_eq!(m.x_axis.x, 1.0);
    }

    #[test]
    fn test_set_translation_keeps_linear_part() {
        let mut m = Mat3::from_scale(Vec2::new(2.0, 3.0));
        m.set_translation(Vec2::new(4.0, 5.0));
        assert_eq!(m.x_axis, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(m.y_axis, Vec3::new(0.0, 3.0, 0.0));
        assert_eq!(m.z_axis, Vec3::new(4.0, 5.0, 1.0));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_axis_out_of_range() {
        let mut m = Mat3::IDENTITY;
        m.set_translation_axis(2, 1.0);
    }
}
