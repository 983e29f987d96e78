use std::sync::Arc;

use onyx_test_utils::GpuDevice;

use crate::config::{DEFAULT_CIRCLE_VERTICES, RendererConfig};
use crate::copy::CopyInfo;
use crate::device_data::DeviceData;
use crate::error::Result;
use crate::frame::PassInfo;
use crate::instance::{CircleInstanceData, InstanceLayout};
use crate::pipeline::GeometryFamily;
use crate::task::UploadJob;

use super::GeometryRenderer;

/// Circles and arcs, shaded over a quad in the fragment stage.
///
/// There is a single circle batch, so all instances go out in one non-indexed draw.
pub struct CircleRenderer<I: InstanceLayout> {
    instances: Arc<Vec<CircleInstanceData<I>>>,
    data: DeviceData<CircleInstanceData<I>>,
}

impl<I: InstanceLayout> CircleRenderer<I> {
    pub fn new(
        device: Arc<dyn GpuDevice>,
        label: impl Into<String>,
        config: &RendererConfig,
    ) -> Result<Self> {
        Ok(Self {
            instances: Arc::default(),
            data: DeviceData::storage(
                device,
                label,
                config.frames_in_flight,
                config.initial_capacity,
            )?,
        })
    }

    pub fn draw(&mut self, instance: CircleInstanceData<I>) {
        Arc::make_mut(&mut self.instances).push(instance);
    }

    pub fn instances(&self) -> &[CircleInstanceData<I>] {
        &self.instances
    }

    pub fn device_data(&self) -> &DeviceData<CircleInstanceData<I>> {
        &self.data
    }
}

impl<I: InstanceLayout> GeometryRenderer for CircleRenderer<I> {
    fn flush(&mut self) {
        Arc::make_mut(&mut self.instances).clear();
    }

    fn instance_count(&self) -> usize {
        self.instances.len()
    }

    fn grow_to_fit(&mut self, frame: usize) -> Result<()> {
        self.data.ensure_capacity(frame, self.instances.len())?;
        Ok(())
    }

    fn upload_jobs(&self, frame: usize, jobs: &mut Vec<UploadJob>) -> Result<()> {
        if self.has_instances() {
            jobs.push(self.data.upload_job(frame, vec![self.instances.clone()])?);
        }
        Ok(())
    }

    fn record_copy_commands(&self, frame: usize, info: &mut CopyInfo<'_>) -> Result<()> {
        if self.has_instances() {
            self.data.record_copy(frame, self.instances.len(), info)?;
        }
        Ok(())
    }

    fn render(&self, info: &mut PassInfo<'_>) -> Result<()> {
        if !self.has_instances() {
            return Ok(());
        }
        info.bind(GeometryFamily::Circle, self.data.storage_descriptor(info.frame)?);
        info.draw(DEFAULT_CIRCLE_VERTICES, self.instances.len() as u32);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::dimension::DimensionKind;
    use crate::frame::FrameStats;
    use crate::instance::InstanceData2D;
    use crate::options::CircleOptions;
    use crate::pipeline::{PipelineKey, UnlitPushConstants};
    use crate::stencil::StencilPass;
    use glam::{Mat3, Mat4};
    use onyx_test_utils::{MockCommandRecorder, MockGpuDevice, RecordedCommand};

    #[test]
    fn test_single_quad_draw() {
        let mut renderer = CircleRenderer::<InstanceData2D>::new(
            Arc::new(MockGpuDevice::new()),
            "circle",
            &RendererConfig::default(),
        )
        .unwrap();
        let base = InstanceData2D::fill(&Mat3::IDENTITY, Color::RED);
        for _ in 0..3 {
            renderer.draw(CircleInstanceData::new(base, &CircleOptions::default()));
        }

        let mut recorder = MockCommandRecorder::new();
        let mut stats = FrameStats::default();
        let mut info = PassInfo {
            frame: 1,
            dimension: DimensionKind::Two,
            pass: StencilPass::DoStencilWriteDoFill,
            recorder: &mut recorder,
            unlit: UnlitPushConstants::new(&Mat4::IDENTITY),
            lighting: None,
            stats: &mut stats,
        };
        renderer.render(&mut info).unwrap();

        assert_eq!(
            recorder.bound_pipelines(),
            vec![
                PipelineKey::new(
                    DimensionKind::Two,
                    GeometryFamily::Circle,
                    StencilPass::DoStencilWriteDoFill
                )
                .id()
            ]
        );
        assert_eq!(
            recorder.commands().last(),
            Some(&RecordedCommand::Draw {
                vertex_count: 6,
                instance_count: 3,
                first_vertex: 0,
                first_instance: 0,
            })
        );
    }
}
