//! Four per-pass renderers of one geometry family.

use crate::batched::GeometryRenderer;
use crate::copy::CopyInfo;
use crate::error::Result;
use crate::frame::PassInfo;
use crate::stencil::{DrawMode, StencilPass};
use crate::task::UploadJob;

/// Mutable access to the renderer of one pass, typed by the record layout it consumes.
pub enum PassRenderer<'a, F, S> {
    Fill(&'a mut F),
    Stencil(&'a mut S),
}

/// One renderer per [`StencilPass`]. `F` consumes fill records, `S` outline records.
pub struct RenderGroup<F, S> {
    pub no_stencil_write_do_fill: F,
    pub do_stencil_write_do_fill: F,
    pub do_stencil_write_no_fill: S,
    pub do_stencil_test_no_fill: S,
}

impl<F: GeometryRenderer, S: GeometryRenderer> RenderGroup<F, S> {
    /// Build the four renderers, passing each constructor the pass it serves.
    pub fn try_new(
        mut fill: impl FnMut(StencilPass) -> Result<F>,
        mut stencil: impl FnMut(StencilPass) -> Result<S>,
    ) -> Result<Self> {
        Ok(Self {
            no_stencil_write_do_fill: fill(StencilPass::NoStencilWriteDoFill)?,
            do_stencil_write_do_fill: fill(StencilPass::DoStencilWriteDoFill)?,
            do_stencil_write_no_fill: stencil(StencilPass::DoStencilWriteNoFill)?,
            do_stencil_test_no_fill: stencil(StencilPass::DoStencilTestNoFill)?,
        })
    }

    pub fn select(&self, pass: StencilPass) -> &dyn GeometryRenderer {
        match pass {
            StencilPass::NoStencilWriteDoFill => &self.no_stencil_write_do_fill,
            StencilPass::DoStencilWriteDoFill => &self.do_stencil_write_do_fill,
            StencilPass::DoStencilWriteNoFill => &self.do_stencil_write_no_fill,
            StencilPass::DoStencilTestNoFill => &self.do_stencil_test_no_fill,
        }
    }

    pub fn renderer_mut(&mut self, pass: StencilPass) -> PassRenderer<'_, F, S> {
        match pass {
            StencilPass::NoStencilWriteDoFill => PassRenderer::Fill(&mut self.no_stencil_write_do_fill),
            StencilPass::DoStencilWriteDoFill => PassRenderer::Fill(&mut self.do_stencil_write_do_fill),
            StencilPass::DoStencilWriteNoFill => PassRenderer::Stencil(&mut self.do_stencil_write_no_fill),
            StencilPass::DoStencilTestNoFill => PassRenderer::Stencil(&mut self.do_stencil_test_no_fill),
        }
    }

    fn renderers(&self) -> [&dyn GeometryRenderer; 4] {
        StencilPass::ALL.map(|pass| self.select(pass))
    }

    pub fn flush(&mut self) {
        self.no_stencil_write_do_fill.flush();
        self.do_stencil_write_do_fill.flush();
        self.do_stencil_write_no_fill.flush();
        self.do_stencil_test_no_fill.flush();
    }

    pub fn instance_count(&self, pass: StencilPass) -> usize {
        self.select(pass).instance_count()
    }

    pub fn total_instances(&self) -> usize {
        self.renderers().iter().map(|r| r.instance_count()).sum()
    }

    pub fn has_instances(&self) -> bool {
        self.renderers().iter().any(|r| r.has_instances())
    }

    pub fn grow_to_fit(&mut self, frame: usize) -> Result<()> {
        self.no_stencil_write_do_fill.grow_to_fit(frame)?;
        self.do_stencil_write_do_fill.grow_to_fit(frame)?;
        self.do_stencil_write_no_fill.grow_to_fit(frame)?;
        self.do_stencil_test_no_fill.grow_to_fit(frame)?;
        Ok(())
    }

    pub fn upload_jobs(&self, frame: usize, jobs: &mut Vec<UploadJob>) -> Result<()> {
        for renderer in self.renderers() {
            renderer.upload_jobs(frame, jobs)?;
        }
        Ok(())
    }

    pub fn record_copy_commands(&self, frame: usize, info: &mut CopyInfo<'_>) -> Result<()> {
        for renderer in self.renderers() {
            renderer.record_copy_commands(frame, info)?;
        }
        Ok(())
    }

    /// Record the pass named by `info.pass`.
    pub fn render(&self, info: &mut PassInfo<'_>) -> Result<()> {
        self.select(info.pass).render(info)
    }
}

impl<'a, F, S> PassRenderer<'a, F, S> {
    pub fn draw_mode(&self) -> DrawMode {
        match self {
            PassRenderer::Fill(_) => DrawMode::Fill,
            PassRenderer::Stencil(_) => DrawMode::Stencil,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batched::CircleRenderer;
    use crate::color::Color;
    use crate::config::RendererConfig;
    use crate::instance::{CircleInstanceData, InstanceData2D};
    use crate::options::CircleOptions;
    use glam::Mat3;
    use onyx_test_utils::MockGpuDevice;
    use std::sync::Arc;

    type Group = RenderGroup<CircleRenderer<InstanceData2D>, CircleRenderer<InstanceData2D>>;

    fn group() -> Group {
        let device = Arc::new(MockGpuDevice::new());
        let config = RendererConfig::default();
        RenderGroup::try_new(
            |pass| CircleRenderer::new(device.clone(), pass.name(), &config),
            |pass| CircleRenderer::new(device.clone(), pass.name(), &config),
        )
        .unwrap()
    }

    fn circle() -> CircleInstanceData<InstanceData2D> {
        CircleInstanceData::new(
            InstanceData2D::fill(&Mat3::IDENTITY, Color::WHITE),
            &CircleOptions::default(),
        )
    }

    #[test]
    fn test_renderer_mut_matches_draw_mode() {
        let mut group = group();
        for pass in StencilPass::ALL {
            assert_eq!(group.renderer_mut(pass).draw_mode(), pass.draw_mode());
        }
    }

    #[test]
    fn test_fan_out() {
        let mut group = group();
        if let PassRenderer::Stencil(renderer) = group.renderer_mut(StencilPass::DoStencilTestNoFill) {
            renderer.draw(circle());
        }
        assert!(group.has_instances());
        assert_eq!(group.instance_count(StencilPass::DoStencilTestNoFill), 1);
        assert_eq!(group.instance_count(StencilPass::NoStencilWriteDoFill), 0);

        let mut jobs = Vec::new();
        group.upload_jobs(0, &mut jobs).unwrap();
        assert_eq!(jobs.len(), 1);

        group.flush();
        assert_eq!(group.total_instances(), 0);
    }
}
