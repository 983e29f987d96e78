//! Fixed-function state of the per-pass pipelines.
//!
//! Shader code is owned by the backend; this module decides the depth/stencil, color-write
//! and push constant layout every `(dimension, geometry, pass)` combination uses.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use onyx_test_utils::PipelineId;

use crate::color::Color;
use crate::dimension::DimensionKind;
use crate::stencil::{DrawMode, StencilPass};

/// Format of the depth/stencil attachment every pass renders against.
pub const DEPTH_STENCIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Stencil value written by the write passes and tested by the outline pass.
pub const STENCIL_REFERENCE: u32 = 1;

/// Geometry families, each with its own vertex pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GeometryFamily {
    /// Indexed static meshes and primitives.
    Mesh,
    /// Quads shaded into circles and arcs.
    Circle,
    /// Host-triangulated polygons.
    Polygon,
}

/// Whether a pass evaluates lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shading {
    Unlit,
    Lit,
}

impl Shading {
    /// 2D is always unlit. 3D lights the passes that output the fill color.
    pub fn for_pass(dimension: DimensionKind, pass: StencilPass) -> Self {
        match (dimension, pass.draw_mode()) {
            (DimensionKind::Three, DrawMode::Fill) => Shading::Lit,
            _ => Shading::Unlit,
        }
    }
}

/// Identifies one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipelineKey {
    pub dimension: DimensionKind,
    pub geometry: GeometryFamily,
    pub pass: StencilPass,
}

impl PipelineKey {
    pub fn new(dimension: DimensionKind, geometry: GeometryFamily, pass: StencilPass) -> Self {
        Self {
            dimension,
            geometry,
            pass,
        }
    }

    /// Stable numeric id, unique per key.
    pub fn id(&self) -> PipelineId {
        PipelineId((self.dimension as u32) << 8 | (self.geometry as u32) << 4 | self.pass as u32)
    }

    pub fn spec(&self) -> PipelineSpec {
        PipelineSpec::for_pass(self.dimension, self.pass)
    }

    pub fn label(&self) -> String {
        let dimension = match self.dimension {
            DimensionKind::Two => "2d",
            DimensionKind::Three => "3d",
        };
        let geometry = match self.geometry {
            GeometryFamily::Mesh => "mesh",
            GeometryFamily::Circle => "circle",
            GeometryFamily::Polygon => "polygon",
        };
        format!("{dimension}::{geometry}::{}", self.pass.name())
    }
}

/// Stencil face state shared by front and back faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilSpec {
    pub compare: wgpu::CompareFunction,
    pub fail_op: wgpu::StencilOperation,
    pub pass_op: wgpu::StencilOperation,
    pub depth_fail_op: wgpu::StencilOperation,
    pub read_mask: u32,
    pub write_mask: u32,
    pub reference: u32,
}

impl StencilSpec {
    fn write() -> Self {
        Self {
            compare: wgpu::CompareFunction::Always,
            fail_op: wgpu::StencilOperation::Replace,
            pass_op: wgpu::StencilOperation::Replace,
            depth_fail_op: wgpu::StencilOperation::Replace,
            read_mask: 0xFF,
            write_mask: 0xFF,
            reference: STENCIL_REFERENCE,
        }
    }

    fn test() -> Self {
        Self {
            compare: wgpu::CompareFunction::NotEqual,
            fail_op: wgpu::StencilOperation::Keep,
            pass_op: wgpu::StencilOperation::Replace,
            depth_fail_op: wgpu::StencilOperation::Keep,
            read_mask: 0xFF,
            write_mask: 0,
            reference: STENCIL_REFERENCE,
        }
    }

    pub fn to_wgpu(&self) -> wgpu::StencilState {
        let face = wgpu::StencilFaceState {
            compare: self.compare,
            fail_op: self.fail_op,
            depth_fail_op: self.depth_fail_op,
            pass_op: self.pass_op,
        };
        wgpu::StencilState {
            front: face,
            back: face,
            read_mask: self.read_mask,
            write_mask: self.write_mask,
        }
    }
}

/// Depth, stencil and color-write state of one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSpec {
    pub depth_test: bool,
    pub depth_write: bool,
    /// `None` leaves the stencil buffer untouched.
    pub stencil: Option<StencilSpec>,
    pub color_write: bool,
    pub shading: Shading,
}

impl PipelineSpec {
    pub fn for_pass(dimension: DimensionKind, pass: StencilPass) -> Self {
        let depth = dimension == DimensionKind::Three;
        let shading = Shading::for_pass(dimension, pass);
        match pass {
            StencilPass::NoStencilWriteDoFill => Self {
                depth_test: depth,
                depth_write: depth,
                stencil: None,
                color_write: true,
                shading,
            },
            StencilPass::DoStencilWriteDoFill => Self {
                depth_test: depth,
                depth_write: depth,
                stencil: Some(StencilSpec::write()),
                color_write: true,
                shading,
            },
            StencilPass::DoStencilWriteNoFill => Self {
                depth_test: depth,
                depth_write: depth,
                stencil: Some(StencilSpec::write()),
                color_write: false,
                shading,
            },
            StencilPass::DoStencilTestNoFill => Self {
                depth_test: false,
                depth_write: false,
                stencil: Some(StencilSpec::test()),
                color_write: true,
                shading,
            },
        }
    }

    pub fn depth_stencil_state(&self) -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format: DEPTH_STENCIL_FORMAT,
            depth_write_enabled: self.depth_write,
            depth_compare: if self.depth_test {
                wgpu::CompareFunction::LessEqual
            } else {
                wgpu::CompareFunction::Always
            },
            stencil: self
                .stencil
                .map(|stencil| stencil.to_wgpu())
                .unwrap_or_default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }

    pub fn color_writes(&self) -> wgpu::ColorWrites {
        if self.color_write {
            wgpu::ColorWrites::ALL
        } else {
            wgpu::ColorWrites::empty()
        }
    }

    pub fn push_constant_size(&self) -> u32 {
        match self.shading {
            Shading::Unlit => size_of::<UnlitPushConstants>() as u32,
            Shading::Lit => size_of::<LitPushConstants>() as u32,
        }
    }
}

/// Push constants of unlit passes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct UnlitPushConstants {
    pub projection_view: [[f32; 4]; 4],
}

impl UnlitPushConstants {
    pub fn new(projection_view: &Mat4) -> Self {
        Self {
            projection_view: projection_view.to_cols_array_2d(),
        }
    }
}

/// Push constants of lit 3D passes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LitPushConstants {
    pub projection_view: [[f32; 4]; 4],
    pub view_position: [f32; 4],
    /// RGB ambient color, intensity in the last component.
    pub ambient_color: [f32; 4],
    pub directional_count: u32,
    pub point_count: u32,
    pub _padding: [u32; 2],
}

impl LitPushConstants {
    pub fn new(
        projection_view: &Mat4,
        view_position: Vec3,
        ambient: Color,
        directional_count: u32,
        point_count: u32,
    ) -> Self {
        Self {
            projection_view: projection_view.to_cols_array_2d(),
            view_position: view_position.extend(1.0).to_array(),
            ambient_color: ambient.to_array(),
            directional_count,
            point_count,
            _padding: [0; 2],
        }
    }
}

static_assertions::assert_eq_size!(UnlitPushConstants, [u8; 64]);
static_assertions::assert_eq_size!(LitPushConstants, [u8; 112]);
