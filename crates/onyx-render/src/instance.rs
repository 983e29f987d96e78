//! Per-instance records uploaded to device storage buffers.
//!
//! Every layout is `#[repr(C)]`, built only from 4-byte scalars, and sized to a multiple of
//! 16 bytes so arrays of records match the std430 layout the shaders read.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3, Vec4};

use crate::color::Color;
use crate::state::MaterialData;

/// Texture index stored in untextured 2D instances.
pub const NO_TEXTURE: u32 = u32::MAX;

mod sealed {
    pub trait Sealed {}
}

/// A plain-old-data record one shader invocation reads per instance.
pub trait InstanceLayout: Pod + Send + Sync + std::fmt::Debug + sealed::Sealed {
    /// Packed `Color` of the instance.
    fn base_color(&self) -> u32;
}

/// 2D instance, shared by fill and outline passes.
///
/// `basis` holds the three columns of the 2D affine matrix (the last one is the
/// translation). `payload` is a texture index for fill passes and the bit pattern of the
/// outline width for outline passes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceData2D {
    pub basis: [[f32; 2]; 3],
    pub base_color: u32,
    pub payload: u32,
}

// SAFETY: repr(C) struct of f32/u32 fields with no padding (asserted below)
unsafe impl Pod for InstanceData2D {}
unsafe impl Zeroable for InstanceData2D {}

impl InstanceData2D {
    pub fn fill(transform: &Mat3, color: Color) -> Self {
        Self {
            basis: basis_2d(transform),
            base_color: color.pack(),
            payload: NO_TEXTURE,
        }
    }

    pub fn stencil(transform: &Mat3, color: Color, outline_width: f32) -> Self {
        Self {
            basis: basis_2d(transform),
            base_color: color.pack(),
            payload: outline_width.to_bits(),
        }
    }

    pub fn tex_index(&self) -> u32 {
        self.payload
    }

    pub fn outline_width(&self) -> f32 {
        f32::from_bits(self.payload)
    }

    /// Reassemble the affine matrix the record was built from.
    pub fn transform(&self) -> Mat3 {
        let [x, y, t] = self.basis;
        Mat3::from_cols(
            Vec3::new(x[0], x[1], 0.0),
            Vec3::new(y[0], y[1], 0.0),
            Vec3::new(t[0], t[1], 1.0),
        )
    }
}

fn basis_2d(transform: &Mat3) -> [[f32; 2]; 3] {
    [
        transform.x_axis.truncate().to_array(),
        transform.y_axis.truncate().to_array(),
        transform.z_axis.truncate().to_array(),
    ]
}

/// Rows of the upper 3x4 block of a 3D affine matrix.
fn basis_3d(transform: &Mat4) -> [[f32; 4]; 3] {
    let rows = transform.transpose();
    [
        rows.x_axis.to_array(),
        rows.y_axis.to_array(),
        rows.z_axis.to_array(),
    ]
}

fn transform_from_rows(basis: &[[f32; 4]; 3]) -> Mat4 {
    Mat4::from_cols(
        Vec4::from_array(basis[0]),
        Vec4::from_array(basis[1]),
        Vec4::from_array(basis[2]),
        Vec4::W,
    )
    .transpose()
}

/// 3D instance for passes that output the fill color. Carries the lit material.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceData3DFill {
    pub basis: [[f32; 4]; 3],
    pub base_color: u32,
    pub diffuse_contribution: f32,
    pub specular_contribution: f32,
    pub specular_sharpness: f32,
}

// SAFETY: repr(C) struct of f32/u32 fields with no padding (asserted below)
unsafe impl Pod for InstanceData3DFill {}
unsafe impl Zeroable for InstanceData3DFill {}

impl InstanceData3DFill {
    pub fn new(transform: &Mat4, color: Color, material: &MaterialData) -> Self {
        Self {
            basis: basis_3d(transform),
            base_color: color.pack(),
            diffuse_contribution: material.diffuse_contribution,
            specular_contribution: material.specular_contribution,
            specular_sharpness: material.specular_sharpness,
        }
    }

    pub fn transform(&self) -> Mat4 {
        transform_from_rows(&self.basis)
    }
}

/// 3D instance for stencil outline passes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceData3DStencil {
    pub basis: [[f32; 4]; 3],
    pub base_color: u32,
    pub outline_width: f32,
    _padding: [u32; 2],
}

// SAFETY: repr(C) struct of f32/u32 fields, padding is explicit
unsafe impl Pod for InstanceData3DStencil {}
unsafe impl Zeroable for InstanceData3DStencil {}

impl InstanceData3DStencil {
    pub fn new(transform: &Mat4, color: Color, outline_width: f32) -> Self {
        Self {
            basis: basis_3d(transform),
            base_color: color.pack(),
            outline_width,
            _padding: [0; 2],
        }
    }

    pub fn transform(&self) -> Mat4 {
        transform_from_rows(&self.basis)
    }
}

/// Arc and fade parameters appended to a base instance for circle geometry.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleInstanceData<T> {
    pub base: T,
    pub lower_cos: f32,
    pub lower_sin: f32,
    pub upper_cos: f32,
    pub upper_sin: f32,
    /// 1 when the arc spans more than half a turn.
    pub angle_overflow: u32,
    pub hollowness: f32,
    pub inner_fade: f32,
    pub outer_fade: f32,
}

// SAFETY: T is one of the sealed layouts above (4-byte aligned, size a multiple of 16) and
// the remaining fields are eight 4-byte scalars, so repr(C) inserts no padding.
unsafe impl<T: InstanceLayout> Pod for CircleInstanceData<T> {}
unsafe impl<T: InstanceLayout> Zeroable for CircleInstanceData<T> {}

impl<T: InstanceLayout> CircleInstanceData<T> {
    pub fn new(base: T, options: &crate::options::CircleOptions) -> Self {
        let (lower_sin, lower_cos) = options.lower_angle.sin_cos();
        let (upper_sin, upper_cos) = options.upper_angle.sin_cos();
        Self {
            base,
            lower_cos,
            lower_sin,
            upper_cos,
            upper_sin,
            angle_overflow: options.angle_overflow() as u32,
            hollowness: options.hollowness,
            inner_fade: options.inner_fade,
            outer_fade: options.outer_fade,
        }
    }
}

impl sealed::Sealed for InstanceData2D {}
impl sealed::Sealed for InstanceData3DFill {}
impl sealed::Sealed for InstanceData3DStencil {}
impl<T: InstanceLayout> sealed::Sealed for CircleInstanceData<T> {}

impl InstanceLayout for InstanceData2D {
    fn base_color(&self) -> u32 {
        self.base_color
    }
}

impl InstanceLayout for InstanceData3DFill {
    fn base_color(&self) -> u32 {
        self.base_color
    }
}

impl InstanceLayout for InstanceData3DStencil {
    fn base_color(&self) -> u32 {
        self.base_color
    }
}

impl<T: InstanceLayout> InstanceLayout for CircleInstanceData<T> {
    fn base_color(&self) -> u32 {
        self.base.base_color()
    }
}

/// Draw range of one polygon inside the shared polygon vertex/index buffers.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct PolygonLayout {
    pub vertices_start: u32,
    pub indices_start: u32,
    pub indices_size: u32,
}

static_assertions::assert_eq_size!(InstanceData2D, [u8; 32]);
static_assertions::assert_eq_size!(InstanceData3DFill, [u8; 64]);
static_assertions::assert_eq_size!(InstanceData3DStencil, [u8; 64]);
static_assertions::assert_eq_size!(CircleInstanceData<InstanceData2D>, [u8; 64]);
static_assertions::assert_eq_size!(CircleInstanceData<InstanceData3DFill>, [u8; 96]);
static_assertions::assert_eq_size!(CircleInstanceData<InstanceData3DStencil>, [u8; 96]);
