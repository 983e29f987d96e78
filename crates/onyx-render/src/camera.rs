//! Cameras and the per-camera record the renderer draws against.
//!
//! A [`Camera`] computes view and projection matrices. The renderer itself only consumes
//! [`CameraInfo`], which can also be built by hand from an external camera system.
//!
//! # Example
//!
//! ```
//! use onyx_render::{Camera, CameraInfo, Color, ScissorRect, Viewport};
//! use glam::Vec3;
//!
//! let mut camera = Camera::perspective(60.0, 16.0 / 9.0, 0.1, 100.0);
//! camera.look_at(Vec3::new(0.0, 5.0, 10.0), Vec3::ZERO, Vec3::Y);
//!
//! let info = CameraInfo::from_camera(
//!     &camera,
//!     Viewport::new(0.0, 0.0, 1280.0, 720.0),
//!     ScissorRect::new(0, 0, 1280, 720),
//! )
//! .with_background(Color::BLACK);
//! assert!(!info.transparent);
//! ```

use glam::{Mat4, Vec3};
pub use onyx_test_utils::{ScissorRect, Viewport};

use crate::color::Color;

/// Projection mode for a camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionMode {
    /// Orthographic projection (typically for 2D).
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
    /// Perspective projection (typically for 3D).
    Perspective {
        fov_y_radians: f32,
        aspect_ratio: f32,
        near: f32,
        far: f32,
    },
}

/// A camera with view and projection matrices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    position: Vec3,
    target: Vec3,
    up: Vec3,
    projection: ProjectionMode,
}

impl Camera {
    /// Create an orthographic camera centered on the origin.
    pub fn orthographic(width: f32, height: f32, near: f32, far: f32) -> Self {
        let half_width = width / 2.0;
        let half_height = height / 2.0;

        Self {
            position: Vec3::new(0.0, 0.0, 1.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            projection: ProjectionMode::Orthographic {
                left: -half_width,
                right: half_width,
                bottom: -half_height,
                top: half_height,
                near,
                far,
            },
        }
    }

    /// Create a perspective camera.
    ///
    /// # Arguments
    ///
    /// * `fov_y_degrees` - Vertical field of view in degrees
    /// * `aspect_ratio` - Aspect ratio (width / height)
    /// * `near` - Near clip plane
    /// * `far` - Far clip plane
    pub fn perspective(fov_y_degrees: f32, aspect_ratio: f32, near: f32, far: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 5.0, 10.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            projection: ProjectionMode::Perspective {
                fov_y_radians: fov_y_degrees.to_radians(),
                aspect_ratio,
                near,
                far,
            },
        }
    }

    /// Set the camera to look at a target from a position.
    pub fn look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        self.position = eye;
        self.target = target;
        self.up = up;
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn projection(&self) -> ProjectionMode {
        self.projection
    }

    /// Update the aspect ratio (perspective) or horizontal extent (orthographic).
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        match &mut self.projection {
            ProjectionMode::Perspective {
                aspect_ratio: ratio,
                ..
            } => *ratio = aspect_ratio,
            ProjectionMode::Orthographic {
                left,
                right,
                bottom,
                top,
                ..
            } => {
                let half_width = (*top - *bottom) * aspect_ratio / 2.0;
                let center = (*left + *right) / 2.0;
                *left = center - half_width;
                *right = center + half_width;
            }
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            ProjectionMode::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => Mat4::orthographic_rh(left, right, bottom, top, near, far),
            ProjectionMode::Perspective {
                fov_y_radians,
                aspect_ratio,
                near,
                far,
            } => Mat4::perspective_rh(fov_y_radians, aspect_ratio, near, far),
        }
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

/// Everything the renderer needs to draw one camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraInfo {
    pub projection_view: Mat4,
    /// World-space eye position, used for specular lighting.
    pub view_position: Vec3,
    pub viewport: Viewport,
    pub scissor: ScissorRect,
    pub background: Color,
    /// Transparent cameras skip the background clear.
    pub transparent: bool,
}

impl CameraInfo {
    pub fn new(projection_view: Mat4, viewport: Viewport, scissor: ScissorRect) -> Self {
        Self {
            projection_view,
            view_position: Vec3::ZERO,
            viewport,
            scissor,
            background: Color::BLACK,
            transparent: false,
        }
    }

    pub fn from_camera(camera: &Camera, viewport: Viewport, scissor: ScissorRect) -> Self {
        Self {
            view_position: camera.position(),
            ..Self::new(camera.view_projection_matrix(), viewport, scissor)
        }
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn transparent(mut self) -> Self {
        self.transparent = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orthographic_maps_extent_to_ndc() {
        let camera = Camera::orthographic(800.0, 600.0, 0.1, 100.0);
        let clip = camera.view_projection_matrix() * glam::Vec4::new(400.0, 300.0, 0.0, 1.0);
        assert!((clip.x - 1.0).abs() < 1e-5);
        assert!((clip.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_set_aspect_ratio() {
        let mut camera = Camera::perspective(60.0, 1.0, 0.1, 100.0);
        camera.set_aspect_ratio(2.0);
        match camera.projection() {
            ProjectionMode::Perspective { aspect_ratio, .. } => assert_eq!(aspect_ratio, 2.0),
            _ => unreachable!(),
        }

        let mut camera = Camera::orthographic(2.0, 2.0, 0.1, 10.0);
        camera.set_aspect_ratio(2.0);
        match camera.projection() {
            ProjectionMode::Orthographic { left, right, .. } => {
                assert_eq!(left, -2.0);
                assert_eq!(right, 2.0);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_camera_info_from_camera() {
        let camera = Camera::perspective(45.0, 1.5, 0.1, 50.0);
        let info = CameraInfo::from_camera(
            &camera,
            Viewport::new(0.0, 0.0, 300.0, 200.0),
            ScissorRect::new(0, 0, 300, 200),
        )
        .transparent();

        assert_eq!(info.view_position, Vec3::new(0.0, 5.0, 10.0));
        assert_eq!(info.projection_view, camera.view_projection_matrix());
        assert!(info.transparent);
    }
}
