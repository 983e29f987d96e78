//! Stencil pass resolution.
//!
//! A shape's fill and outline flags select one or two of four fixed passes. Rendering the
//! passes in [`StencilPass::ALL`] order draws outlines as clean rings around their shapes
//! no matter the order the shapes were submitted in.

use crate::state::RenderStateFlags;

/// One of the four stencil sub-passes, declared in render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StencilPass {
    /// Filled shapes without outline. Leaves the stencil buffer untouched.
    NoStencilWriteDoFill,
    /// Filled and outlined shapes. Writes the footprint to the stencil buffer.
    DoStencilWriteDoFill,
    /// Outline-only shapes. Writes the footprint, outputs no color.
    DoStencilWriteNoFill,
    /// Outline ring, drawn where the stencil buffer was not written.
    DoStencilTestNoFill,
}

impl StencilPass {
    pub const ALL: [StencilPass; 4] = [
        StencilPass::NoStencilWriteDoFill,
        StencilPass::DoStencilWriteDoFill,
        StencilPass::DoStencilWriteNoFill,
        StencilPass::DoStencilTestNoFill,
    ];

    /// Record layout used by the pass.
    pub const fn draw_mode(self) -> DrawMode {
        match self {
            StencilPass::NoStencilWriteDoFill | StencilPass::DoStencilWriteDoFill => DrawMode::Fill,
            StencilPass::DoStencilWriteNoFill | StencilPass::DoStencilTestNoFill => DrawMode::Stencil,
        }
    }

    pub const fn writes_stencil(self) -> bool {
        matches!(
            self,
            StencilPass::DoStencilWriteDoFill | StencilPass::DoStencilWriteNoFill
        )
    }

    pub const fn tests_stencil(self) -> bool {
        matches!(self, StencilPass::DoStencilTestNoFill)
    }

    /// Whether the pass writes color at all.
    pub const fn writes_color(self) -> bool {
        !matches!(self, StencilPass::DoStencilWriteNoFill)
    }

    pub const fn name(self) -> &'static str {
        match self {
            StencilPass::NoStencilWriteDoFill => "no_stencil_write_do_fill",
            StencilPass::DoStencilWriteDoFill => "do_stencil_write_do_fill",
            StencilPass::DoStencilWriteNoFill => "do_stencil_write_no_fill",
            StencilPass::DoStencilTestNoFill => "do_stencil_test_no_fill",
        }
    }
}

/// Which instance layout a pass consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawMode {
    /// Fill color (and material in 3D).
    Fill,
    /// Outline color and outline width.
    Stencil,
}

/// Resolve the passes a draw call is submitted to, in submission order.
///
/// | Fill | Outline | Passes |
/// |------|---------|--------|
/// | yes  | no      | `NoStencilWriteDoFill` |
/// | yes  | yes     | `DoStencilWriteDoFill`, `DoStencilTestNoFill` |
/// | no   | yes     | `DoStencilWriteNoFill`, `DoStencilTestNoFill` |
/// | no   | no      | none |
pub fn resolve_passes(flags: RenderStateFlags) -> &'static [StencilPass] {
    let fill = flags.contains(RenderStateFlags::FILL);
    let outline = flags.contains(RenderStateFlags::OUTLINE);
    match (fill, outline) {
        (true, false) => &[StencilPass::NoStencilWriteDoFill],
        (true, true) => &[
            StencilPass::DoStencilWriteDoFill,
            StencilPass::DoStencilTestNoFill,
        ],
        (false, true) => &[
            StencilPass::DoStencilWriteNoFill,
            StencilPass::DoStencilTestNoFill,
        ],
        (false, false) => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_table() {
        assert_eq!(
            resolve_passes(RenderStateFlags::FILL),
            &[StencilPass::NoStencilWriteDoFill]
        );
        assert_eq!(
            resolve_passes(RenderStateFlags::FILL | RenderStateFlags::OUTLINE),
            &[
                StencilPass::DoStencilWriteDoFill,
                StencilPass::DoStencilTestNoFill
            ]
        );
        assert_eq!(
            resolve_passes(RenderStateFlags::OUTLINE),
            &[
                StencilPass::DoStencilWriteNoFill,
                StencilPass::DoStencilTestNoFill
            ]
        );
        assert!(resolve_passes(RenderStateFlags::empty()).is_empty());
    }

    #[test]
    fn test_write_passes_precede_test_pass() {
        let test_position = StencilPass::ALL
            .iter()
            .position(|p| p.tests_stencil())
            .unwrap();
        for (i, pass) in StencilPass::ALL.iter().enumerate() {
            if pass.writes_stencil() {
                assert!(i < test_position);
            }
        }
        assert!(StencilPass::ALL.is_sorted());
    }

    #[test]
    fn test_draw_modes() {
        assert_eq!(StencilPass::NoStencilWriteDoFill.draw_mode(), DrawMode::Fill);
        assert_eq!(StencilPass::DoStencilWriteDoFill.draw_mode(), DrawMode::Fill);
        assert_eq!(StencilPass::DoStencilWriteNoFill.draw_mode(), DrawMode::Stencil);
        assert_eq!(StencilPass::DoStencilTestNoFill.draw_mode(), DrawMode::Stencil);
        assert!(!StencilPass::DoStencilWriteNoFill.writes_color());
    }
}
