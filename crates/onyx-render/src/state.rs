//! The per-frame drawing state stored on the render context's state stack.

use bitflags::bitflags;
use onyx_core::math::AffineTransform;

use crate::color::Color;
use crate::dimension::Dimension;

/// Outline width of a freshly created state.
pub const DEFAULT_OUTLINE_WIDTH: f32 = 0.1;

bitflags! {
    /// Which parts of a shape are drawn.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderStateFlags: u8 {
        const FILL = 1 << 0;
        const OUTLINE = 1 << 1;
    }
}

impl Default for RenderStateFlags {
    fn default() -> Self {
        RenderStateFlags::FILL
    }
}

/// Lighting response of 3D surfaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialData {
    pub diffuse_contribution: f32,
    pub specular_contribution: f32,
    pub specular_sharpness: f32,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            diffuse_contribution: 0.8,
            specular_contribution: 0.2,
            specular_sharpness: 32.0,
        }
    }
}

/// State only 3D contexts carry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface3D {
    /// Color given to lights added without an explicit one.
    pub light_color: Color,
    pub material: MaterialData,
}

impl Default for Surface3D {
    fn default() -> Self {
        Self {
            light_color: Color::WHITE,
            material: MaterialData::default(),
        }
    }
}

/// One frame of the render context's state stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState<D: Dimension> {
    pub transform: D::Matrix,
    pub fill_color: Color,
    pub outline_color: Color,
    pub outline_width: f32,
    pub flags: RenderStateFlags,
    pub surface: D::Surface,
}

impl<D: Dimension> Default for RenderState<D> {
    fn default() -> Self {
        Self {
            transform: D::Matrix::IDENTITY_TRANSFORM,
            fill_color: Color::WHITE,
            outline_color: Color::WHITE,
            outline_width: DEFAULT_OUTLINE_WIDTH,
            flags: RenderStateFlags::default(),
            surface: D::Surface::default(),
        }
    }
}

impl<D: Dimension> RenderState<D> {
    pub fn fills(&self) -> bool {
        self.flags.contains(RenderStateFlags::FILL)
    }

    pub fn outlines(&self) -> bool {
        self.flags.contains(RenderStateFlags::OUTLINE)
    }
}
