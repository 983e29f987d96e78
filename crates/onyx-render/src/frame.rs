//! Per-pass recording state shared by the geometry renderers.

use onyx_test_utils::{CommandRecorder, GpuBindGroup, GpuBuffer};

use crate::dimension::DimensionKind;
use crate::light::LitBinding;
use crate::pipeline::{GeometryFamily, PipelineKey, Shading, UnlitPushConstants};
use crate::stencil::StencilPass;

/// Statistics for a rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draw_calls: usize,
    pub instances: usize,
    /// Upload jobs run by the last `send_to_device`.
    pub uploads: usize,
}

/// Everything a geometry renderer needs to record one stencil pass for one camera.
pub struct PassInfo<'a> {
    pub frame: usize,
    pub dimension: DimensionKind,
    pub pass: StencilPass,
    pub recorder: &'a mut dyn CommandRecorder,
    pub unlit: UnlitPushConstants,
    /// Present when the context has lights (3D).
    pub lighting: Option<LitBinding<'a>>,
    pub stats: &'a mut FrameStats,
}

impl PassInfo<'_> {
    pub fn shading(&self) -> Shading {
        match Shading::for_pass(self.dimension, self.pass) {
            Shading::Lit if self.lighting.is_some() => Shading::Lit,
            _ => Shading::Unlit,
        }
    }

    /// Bind the pipeline of `geometry` for this pass, its descriptor sets and push constants.
    ///
    /// Set 0 is the instance storage buffer, set 1 the lights of lit passes.
    pub fn bind(&mut self, geometry: GeometryFamily, instances: &GpuBindGroup) {
        let key = PipelineKey::new(self.dimension, geometry, self.pass);
        self.recorder.bind_pipeline(key.id());

        match (self.shading(), self.lighting) {
            (Shading::Lit, Some(lit)) => {
                self.recorder
                    .bind_descriptor_sets(0, &[instances, lit.descriptor]);
                self.recorder
                    .push_constants(bytemuck::bytes_of(&lit.push_constants));
            }
            _ => {
                self.recorder.bind_descriptor_sets(0, &[instances]);
                self.recorder.push_constants(bytemuck::bytes_of(&self.unlit));
            }
        }
    }

    pub fn bind_geometry(&mut self, vertices: &GpuBuffer, indices: &GpuBuffer) {
        self.recorder.bind_vertex_buffer(0, vertices);
        self.recorder
            .bind_index_buffer(indices, wgpu::IndexFormat::Uint32);
    }

    pub fn draw(&mut self, vertex_count: u32, instance_count: u32) {
        self.recorder.draw(vertex_count, instance_count, 0, 0);
        self.stats.draw_calls += 1;
        self.stats.instances += instance_count as usize;
    }

    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        self.recorder.draw_indexed(
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        );
        self.stats.draw_calls += 1;
        self.stats.instances += instance_count as usize;
    }
}
