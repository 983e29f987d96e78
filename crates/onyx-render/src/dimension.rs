//! Compile-time specialization of the renderer for 2D and 3D.
//!
//! Everything that differs between dimensions (matrix size, instance layouts, line
//! orientation, camera clears) goes through [`Dimension`]. The render context and the
//! geometry renderers are generic over it; lighting is only exposed on [`D3`] contexts.

use std::f32::consts::PI;
use std::fmt::Debug;
use std::ops::{Add, Mul, Sub};

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Quat, Vec2, Vec3};
use onyx_core::math::AffineTransform;
use onyx_test_utils::ClearRequest;

use crate::camera::CameraInfo;
use crate::color::Color;
use crate::instance::{InstanceData2D, InstanceData3DFill, InstanceData3DStencil, InstanceLayout};
use crate::light::{LightSystem, NoLighting, SceneLighting};
use crate::state::{RenderState, Surface3D};

/// Runtime tag of a [`Dimension`], used in pipeline keys and labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DimensionKind {
    Two,
    Three,
}

mod sealed {
    pub trait Sealed {}
}

pub trait Dimension:
    Copy + Debug + Default + PartialEq + Send + Sync + 'static + sealed::Sealed
{
    const KIND: DimensionKind;
    /// Whether passes use a depth test.
    const HAS_DEPTH: bool;
    /// Colors of the X, Y (and Z) axes drawn by `axes`.
    const AXIS_COLORS: &'static [[u8; 3]];

    type Vector: Copy
        + Debug
        + PartialEq
        + Send
        + Sync
        + Add<Output = Self::Vector>
        + Sub<Output = Self::Vector>
        + Mul<f32, Output = Self::Vector>;
    type Rotation: Copy + Debug + Send + Sync;
    type Matrix: AffineTransform<Vector = Self::Vector, Rotation = Self::Rotation> + Send + Sync + 'static;
    /// Extra per-state data (material and light color in 3D).
    type Surface: Copy + Debug + PartialEq + Default + Send + Sync + 'static;
    type FillInstance: InstanceLayout;
    type StencilInstance: InstanceLayout;
    type Vertex: Pod + Debug + Send + Sync;
    type Lighting: LightSystem;

    fn fill_instance(transform: &Self::Matrix, state: &RenderState<Self>) -> Self::FillInstance;

    fn stencil_instance(transform: &Self::Matrix, state: &RenderState<Self>) -> Self::StencilInstance;

    fn length(v: Self::Vector) -> f32;

    /// Rotation that maps the local X axis onto `delta`.
    fn line_rotation(delta: Self::Vector) -> Self::Rotation;

    /// Scale that stretches a unit mesh to `length` along X and `thickness` across.
    fn line_scale(length: f32, thickness: f32) -> Self::Vector;

    /// Unit vector of the given axis.
    fn unit_axis(axis: usize) -> Self::Vector;

    fn polygon_vertex(point: Vec2) -> Self::Vertex;

    fn clear_request(camera: &CameraInfo) -> ClearRequest;

    /// Transform of a line from `start` to `end`, built intrinsically on top of `base`.
    fn line_transform(base: &Self::Matrix, start: Self::Vector, end: Self::Vector, thickness: f32) -> Self::Matrix {
        let delta = end - start;
        let mut transform = *base;
        transform.translate_intrinsic((start + end) * 0.5);
        transform.rotate_intrinsic(Self::line_rotation(delta));
        transform.scale_intrinsic(Self::line_scale(Self::length(delta), thickness));
        transform
    }
}

/// Two-dimensional rendering: 3x3 homogeneous matrices, angle rotations, no depth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct D2;

/// Three-dimensional rendering: 4x4 matrices, quaternion rotations, depth and lighting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct D3;

impl sealed::Sealed for D2 {}
impl sealed::Sealed for D3 {}

/// Vertex of a 2D polygon.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PolygonVertex2D {
    pub position: [f32; 2],
}

/// Vertex of a planar 3D polygon.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PolygonVertex3D {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Dimension for D2 {
    const KIND: DimensionKind = DimensionKind::Two;
    const HAS_DEPTH: bool = false;
    const AXIS_COLORS: &'static [[u8; 3]] = &[[245, 64, 90], [65, 135, 245]];

    type Vector = Vec2;
    type Rotation = f32;
    type Matrix = Mat3;
    type Surface = ();
    type FillInstance = InstanceData2D;
    type StencilInstance = InstanceData2D;
    type Vertex = PolygonVertex2D;
    type Lighting = NoLighting;

    fn fill_instance(transform: &Mat3, state: &RenderState<Self>) -> InstanceData2D {
        InstanceData2D::fill(transform, state.fill_color)
    }

    fn stencil_instance(transform: &Mat3, state: &RenderState<Self>) -> InstanceData2D {
        InstanceData2D::stencil(transform, state.outline_color, state.outline_width)
    }

    fn length(v: Vec2) -> f32 {
        v.length()
    }

    fn line_rotation(delta: Vec2) -> f32 {
        delta.y.atan2(delta.x)
    }

    fn line_scale(length: f32, thickness: f32) -> Vec2 {
        Vec2::new(length, thickness)
    }

    fn unit_axis(axis: usize) -> Vec2 {
        match axis {
            0 => Vec2::X,
            1 => Vec2::Y,
            _ => panic!("Axis {axis} out of range for 2D"),
        }
    }

    fn polygon_vertex(point: Vec2) -> PolygonVertex2D {
        PolygonVertex2D {
            position: point.to_array(),
        }
    }

    fn clear_request(camera: &CameraInfo) -> ClearRequest {
        ClearRequest {
            color: Some(camera.background.to_array()),
            depth_stencil: None,
        }
    }
}

impl Dimension for D3 {
    const KIND: DimensionKind = DimensionKind::Three;
    const HAS_DEPTH: bool = true;
    const AXIS_COLORS: &'static [[u8; 3]] = &[[245, 64, 90], [180, 245, 65], [65, 135, 245]];

    type Vector = Vec3;
    type Rotation = Quat;
    type Matrix = Mat4;
    type Surface = Surface3D;
    type FillInstance = InstanceData3DFill;
    type StencilInstance = InstanceData3DStencil;
    type Vertex = PolygonVertex3D;
    type Lighting = SceneLighting;

    fn fill_instance(transform: &Mat4, state: &RenderState<Self>) -> InstanceData3DFill {
        InstanceData3DFill::new(transform, state.fill_color, &state.surface.material)
    }

    fn stencil_instance(transform: &Mat4, state: &RenderState<Self>) -> InstanceData3DStencil {
        InstanceData3DStencil::new(transform, state.outline_color, state.outline_width)
    }

    fn length(v: Vec3) -> f32 {
        v.length()
    }

    fn line_rotation(delta: Vec3) -> Quat {
        let dir = delta.normalize_or_zero();
        let axis = Vec3::new(0.0, -dir.z, dir.y);
        if axis.length_squared() > f32::EPSILON {
            let half = 0.5 * dir.x.clamp(-1.0, 1.0).acos();
            let axis = axis.normalize() * half.sin();
            Quat::from_xyzw(axis.x, axis.y, axis.z, half.cos())
        } else if dir.x < 0.0 {
            Quat::from_rotation_z(PI)
        } else {
            Quat::IDENTITY
        }
    }

    fn line_scale(length: f32, thickness: f32) -> Vec3 {
        Vec3::new(length, thickness, thickness)
    }

    fn unit_axis(axis: usize) -> Vec3 {
        match axis {
            0 => Vec3::X,
            1 => Vec3::Y,
            2 => Vec3::Z,
            _ => panic!("Axis {axis} out of range for 3D"),
        }
    }

    fn polygon_vertex(point: Vec2) -> PolygonVertex3D {
        PolygonVertex3D {
            position: point.extend(0.0).to_array(),
            normal: Vec3::Z.to_array(),
        }
    }

    fn clear_request(camera: &CameraInfo) -> ClearRequest {
        ClearRequest {
            color: Some(camera.background.to_array()),
            depth_stencil: Some((1.0, 0)),
        }
    }
}

/// Axis color as a [`Color`].
pub fn axis_color<D: Dimension>(axis: usize) -> Color {
    let [r, g, b] = D::AXIS_COLORS[axis];
    Color::from_rgb_u8(r, g, b)
}
