//! `wgpu` implementation of the GPU capability traits.
//!
//! - [`WgpuDevice`] creates buffers and storage bind groups on a [`GraphicsContext`].
//! - [`WgpuTransferRecorder`] records copies into a command encoder.
//! - [`WgpuPassRecorder`] records binds and draws into an open render pass.
//!
//! `wgpu` tracks buffer hazards itself, so barriers are accepted and dropped. Attachment
//! clears can only happen when a pass begins: open one pass per camera with
//! [`color_operations`] and [`depth_stencil_operations`].

use std::sync::Arc;

use ahash::AHashMap;
use onyx_test_utils::{
    BufferBarrier, BufferDesc, ClearRequest, CommandRecorder, GpuBindGroup, GpuBuffer, GpuDevice,
    GpuError, PipelineId, ScissorRect, StorageDescriptorDesc, Viewport,
};
use parking_lot::Mutex;

use crate::context::GraphicsContext;
use crate::dimension::DimensionKind;
use crate::pipeline::{GeometryFamily, PipelineKey, PipelineSpec, Shading};

/// Shader stages that see instance storage and push constants.
const SHADER_STAGES: wgpu::ShaderStages = wgpu::ShaderStages::VERTEX_FRAGMENT;

pub struct WgpuDevice {
    context: Arc<GraphicsContext>,
    /// Storage layouts keyed by binding count.
    layouts: Mutex<AHashMap<usize, wgpu::BindGroupLayout>>,
}

impl WgpuDevice {
    pub fn new(context: Arc<GraphicsContext>) -> Self {
        Self {
            context,
            layouts: Mutex::new(AHashMap::new()),
        }
    }

    pub fn context(&self) -> &GraphicsContext {
        &self.context
    }

    /// Layout of a bind group with `count` read-only storage buffers at bindings `0..count`.
    ///
    /// Instance sets use one binding, light sets two.
    pub fn storage_layout(&self, count: usize) -> wgpu::BindGroupLayout {
        let mut layouts = self.layouts.lock();
        layouts
            .entry(count)
            .or_insert_with(|| {
                let entries: Vec<_> = (0..count as u32)
                    .map(|binding| wgpu::BindGroupLayoutEntry {
                        binding,
                        visibility: SHADER_STAGES,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: true },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    })
                    .collect();
                self.context
                    .device
                    .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                        label: Some(&format!("onyx::storage_layout::{count}")),
                        entries: &entries,
                    })
            })
            .clone()
    }
}

impl GpuDevice for WgpuDevice {
    fn create_buffer(&self, desc: &BufferDesc) -> Result<GpuBuffer, GpuError> {
        let size = desc.byte_size();
        if size > self.context.max_buffer_size() {
            return Err(GpuError::OutOfMemory { requested: size });
        }
        if size % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(GpuError::BufferCreation(format!(
                "'{}' is {} bytes, not a multiple of {}",
                desc.label,
                size,
                wgpu::COPY_BUFFER_ALIGNMENT
            )));
        }

        let buffer = self.context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&desc.label),
            size,
            usage: desc.kind.usages(),
            mapped_at_creation: false,
        });
        Ok(GpuBuffer::from_wgpu(buffer, desc.kind))
    }

    fn destroy_buffer(&self, buffer: GpuBuffer) {
        buffer.as_wgpu().destroy();
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) -> Result<(), GpuError> {
        buffer.check_write(offset, data.len() as u64)?;
        self.context.queue.write_buffer(buffer.as_wgpu(), offset, data);
        Ok(())
    }

    fn flush_buffer(&self, _buffer: &GpuBuffer) -> Result<(), GpuError> {
        // Queued writes are applied at the next submission; an empty one flushes them.
        self.context.queue.submit(std::iter::empty());
        Ok(())
    }

    fn write_storage_descriptor(
        &self,
        desc: &StorageDescriptorDesc<'_>,
        _previous: Option<&GpuBindGroup>,
    ) -> Result<GpuBindGroup, GpuError> {
        if desc.buffers.is_empty() {
            return Err(GpuError::DescriptorWrite(format!(
                "'{}' binds no buffers",
                desc.label
            )));
        }
        let layout = self.storage_layout(desc.buffers.len());
        let entries: Vec<_> = desc
            .buffers
            .iter()
            .enumerate()
            .map(|(binding, buffer)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: buffer.as_wgpu().as_entire_binding(),
            })
            .collect();

        let bind_group = self
            .context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(desc.label),
                layout: &layout,
                entries: &entries,
            });
        Ok(GpuBindGroup::from_wgpu(bind_group))
    }
}

/// Records copies into a command encoder.
pub struct WgpuTransferRecorder {
    encoder: wgpu::CommandEncoder,
}

impl WgpuTransferRecorder {
    pub fn new(context: &GraphicsContext, label: &str) -> Self {
        Self {
            encoder: context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) }),
        }
    }

    /// The encoder, for recording the render passes that follow the copies.
    pub fn encoder_mut(&mut self) -> &mut wgpu::CommandEncoder {
        &mut self.encoder
    }

    pub fn finish(self) -> wgpu::CommandBuffer {
        self.encoder.finish()
    }
}

fn not_a_render_pass(command: &str) -> ! {
    panic!("{command} cannot be recorded on a transfer encoder")
}

impl CommandRecorder for WgpuTransferRecorder {
    fn copy_buffer(&mut self, src: &GpuBuffer, dst: &GpuBuffer, size: u64) {
        self.encoder
            .copy_buffer_to_buffer(src.as_wgpu(), 0, dst.as_wgpu(), 0, size);
    }

    fn buffer_barriers(&mut self, _barriers: &[BufferBarrier]) {}

    fn bind_pipeline(&mut self, _pipeline: PipelineId) {
        not_a_render_pass("bind_pipeline")
    }

    fn bind_descriptor_sets(&mut self, _first_set: u32, _sets: &[&GpuBindGroup]) {
        not_a_render_pass("bind_descriptor_sets")
    }

    fn push_constants(&mut self, _data: &[u8]) {
        not_a_render_pass("push_constants")
    }

    fn bind_vertex_buffer(&mut self, _slot: u32, _buffer: &GpuBuffer) {
        not_a_render_pass("bind_vertex_buffer")
    }

    fn bind_index_buffer(&mut self, _buffer: &GpuBuffer, _format: wgpu::IndexFormat) {
        not_a_render_pass("bind_index_buffer")
    }

    fn draw(&mut self, _vertex_count: u32, _instance_count: u32, _first_vertex: u32, _first_instance: u32) {
        not_a_render_pass("draw")
    }

    fn draw_indexed(
        &mut self,
        _index_count: u32,
        _instance_count: u32,
        _first_index: u32,
        _vertex_offset: i32,
        _first_instance: u32,
    ) {
        not_a_render_pass("draw_indexed")
    }

    fn set_viewport(&mut self, _viewport: &Viewport) {
        not_a_render_pass("set_viewport")
    }

    fn set_scissor(&mut self, _scissor: &ScissorRect) {
        not_a_render_pass("set_scissor")
    }

    fn clear(&mut self, _clear: &ClearRequest) {
        not_a_render_pass("clear")
    }
}

/// Color attachment operations for a pass opened for one camera.
pub fn color_operations(clear: Option<&ClearRequest>) -> wgpu::Operations<wgpu::Color> {
    let load = match clear.and_then(|c| c.color) {
        Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        }),
        None => wgpu::LoadOp::Load,
    };
    wgpu::Operations {
        load,
        store: wgpu::StoreOp::Store,
    }
}

/// Depth and stencil operations for a pass opened for one camera.
pub fn depth_stencil_operations(
    clear: Option<&ClearRequest>,
) -> (wgpu::Operations<f32>, wgpu::Operations<u32>) {
    match clear.and_then(|c| c.depth_stencil) {
        Some((depth, stencil)) => (
            wgpu::Operations {
                load: wgpu::LoadOp::Clear(depth),
                store: wgpu::StoreOp::Store,
            },
            wgpu::Operations {
                load: wgpu::LoadOp::Clear(stencil),
                store: wgpu::StoreOp::Discard,
            },
        ),
        None => (
            wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            },
            // The stencil buffer only carries outlines within a single camera.
            wgpu::Operations {
                load: wgpu::LoadOp::Clear(0),
                store: wgpu::StoreOp::Discard,
            },
        ),
    }
}

struct CachedPipeline {
    pipeline: wgpu::RenderPipeline,
    spec: PipelineSpec,
}

/// Render pipelines by [`PipelineId`].
#[derive(Default)]
pub struct PipelineCache {
    pipelines: AHashMap<PipelineId, CachedPipeline>,
}

impl PipelineCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: PipelineKey, pipeline: wgpu::RenderPipeline) {
        self.pipelines.insert(
            key.id(),
            CachedPipeline {
                pipeline,
                spec: key.spec(),
            },
        );
    }

    pub fn contains(&self, key: PipelineKey) -> bool {
        self.pipelines.contains_key(&key.id())
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}

/// Records binds and draws into an open render pass.
pub struct WgpuPassRecorder<'a, 'p> {
    pass: &'a mut wgpu::RenderPass<'p>,
    pipelines: &'a PipelineCache,
}

impl<'a, 'p> WgpuPassRecorder<'a, 'p> {
    pub fn new(pass: &'a mut wgpu::RenderPass<'p>, pipelines: &'a PipelineCache) -> Self {
        Self { pass, pipelines }
    }
}

impl CommandRecorder for WgpuPassRecorder<'_, '_> {
    fn copy_buffer(&mut self, _src: &GpuBuffer, _dst: &GpuBuffer, _size: u64) {
        panic!("copy_buffer cannot be recorded inside a render pass")
    }

    fn buffer_barriers(&mut self, _barriers: &[BufferBarrier]) {}

    fn bind_pipeline(&mut self, pipeline: PipelineId) {
        let cached = self
            .pipelines
            .pipelines
            .get(&pipeline)
            .unwrap_or_else(|| panic!("No render pipeline registered for {pipeline:?}"));
        self.pass.set_pipeline(&cached.pipeline);
        if let Some(stencil) = cached.spec.stencil {
            self.pass.set_stencil_reference(stencil.reference);
        }
    }

    fn bind_descriptor_sets(&mut self, first_set: u32, sets: &[&GpuBindGroup]) {
        for (index, set) in sets.iter().enumerate() {
            self.pass
                .set_bind_group(first_set + index as u32, set.as_wgpu(), &[]);
        }
    }

    fn push_constants(&mut self, data: &[u8]) {
        self.pass.set_push_constants(SHADER_STAGES, 0, data);
    }

    fn bind_vertex_buffer(&mut self, slot: u32, buffer: &GpuBuffer) {
        self.pass.set_vertex_buffer(slot, buffer.as_wgpu().slice(..));
    }

    fn bind_index_buffer(&mut self, buffer: &GpuBuffer, format: wgpu::IndexFormat) {
        self.pass.set_index_buffer(buffer.as_wgpu().slice(..), format);
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        self.pass.draw(
            first_vertex..first_vertex + vertex_count,
            first_instance..first_instance + instance_count,
        );
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        self.pass.draw_indexed(
            first_index..first_index + index_count,
            vertex_offset,
            first_instance..first_instance + instance_count,
        );
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        self.pass.set_viewport(
            viewport.x,
            viewport.y,
            viewport.width,
            viewport.height,
            viewport.min_depth,
            viewport.max_depth,
        );
    }

    fn set_scissor(&mut self, scissor: &ScissorRect) {
        self.pass
            .set_scissor_rect(scissor.x, scissor.y, scissor.width, scissor.height);
    }

    fn clear(&mut self, _clear: &ClearRequest) {
        tracing::trace!("Clears are applied through the pass load operations");
    }
}

const POLYGON_2D_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
const POLYGON_3D_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

/// Vertex buffer layout of polygon vertices.
pub fn polygon_vertex_layout(dimension: DimensionKind) -> wgpu::VertexBufferLayout<'static> {
    let (stride, attributes): (u64, &'static [wgpu::VertexAttribute]) = match dimension {
        DimensionKind::Two => (8, &POLYGON_2D_ATTRIBUTES),
        DimensionKind::Three => (24, &POLYGON_3D_ATTRIBUTES),
    };
    wgpu::VertexBufferLayout {
        array_stride: stride,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes,
    }
}

/// Builds the render pipeline of one [`PipelineKey`].
///
/// Depth, stencil, color writes, bind group layouts and push constant ranges all follow from
/// the key; the caller supplies shaders and the color target.
///
/// # Example
///
/// ```ignore
/// let key = PipelineKey::new(DimensionKind::Two, GeometryFamily::Circle, StencilPass::NoStencilWriteDoFill);
/// let pipeline = PassPipelineBuilder::new(&device, key)
///     .shader(&shader)
///     .color_format(wgpu::TextureFormat::Bgra8UnormSrgb)
///     .build();
/// cache.insert(key, pipeline);
/// ```
pub struct PassPipelineBuilder<'a> {
    device: &'a WgpuDevice,
    key: PipelineKey,
    shader: Option<&'a wgpu::ShaderModule>,
    vertex_entry: &'a str,
    fragment_entry: &'a str,
    vertex_buffers: Vec<wgpu::VertexBufferLayout<'a>>,
    color_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    sample_count: u32,
}

impl<'a> PassPipelineBuilder<'a> {
    pub fn new(device: &'a WgpuDevice, key: PipelineKey) -> Self {
        let vertex_buffers = match key.geometry {
            GeometryFamily::Polygon => vec![polygon_vertex_layout(key.dimension)],
            GeometryFamily::Mesh | GeometryFamily::Circle => Vec::new(),
        };
        Self {
            device,
            key,
            shader: None,
            vertex_entry: "vs_main",
            fragment_entry: "fs_main",
            vertex_buffers,
            color_format: wgpu::TextureFormat::Bgra8UnormSrgb,
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            sample_count: 1,
        }
    }

    /// Set the shader module (required).
    pub fn shader(mut self, shader: &'a wgpu::ShaderModule) -> Self {
        self.shader = Some(shader);
        self
    }

    pub fn vertex_entry(mut self, entry: &'a str) -> Self {
        self.vertex_entry = entry;
        self
    }

    pub fn fragment_entry(mut self, entry: &'a str) -> Self {
        self.fragment_entry = entry;
        self
    }

    /// Replace the vertex buffer layouts. Meshes use the layout of the registry's geometry.
    pub fn vertex_buffers(mut self, layouts: Vec<wgpu::VertexBufferLayout<'a>>) -> Self {
        self.vertex_buffers = layouts;
        self
    }

    pub fn color_format(mut self, format: wgpu::TextureFormat) -> Self {
        self.color_format = format;
        self
    }

    pub fn blend(mut self, blend: Option<wgpu::BlendState>) -> Self {
        self.blend = blend;
        self
    }

    pub fn sample_count(mut self, count: u32) -> Self {
        self.sample_count = count;
        self
    }

    /// # Panics
    ///
    /// Panics if no shader module has been set.
    pub fn build(self) -> wgpu::RenderPipeline {
        let shader = self.shader.expect("Shader module is required");
        let spec = self.key.spec();
        let label = self.key.label();

        let instances = self.device.storage_layout(1);
        let lights = self.device.storage_layout(2);
        let mut bind_group_layouts = vec![&instances];
        if spec.shading == Shading::Lit {
            bind_group_layouts.push(&lights);
        }

        let device = &self.device.context().device;
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&label),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[wgpu::PushConstantRange {
                stages: SHADER_STAGES,
                range: 0..spec.push_constant_size(),
            }],
        });

        let cull_mode = match self.key.dimension {
            DimensionKind::Two => None,
            DimensionKind::Three => Some(wgpu::Face::Back),
        };

        tracing::debug!("Building render pipeline {}", label);

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some(self.vertex_entry),
                buffers: &self.vertex_buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some(self.fragment_entry),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.color_format,
                    blend: self.blend,
                    write_mask: spec.color_writes(),
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(spec.depth_stencil_state()),
            multisample: wgpu::MultisampleState {
                count: self.sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onyx_test_utils::BufferKind;

    #[test]
    fn test_color_operations() {
        let clear = ClearRequest {
            color: Some([1.0, 0.5, 0.0, 1.0]),
            depth_stencil: None,
        };
        assert_eq!(
            color_operations(Some(&clear)).load,
            wgpu::LoadOp::Clear(wgpu::Color {
                r: 1.0,
                g: 0.5,
                b: 0.0,
                a: 1.0
            })
        );
        assert_eq!(color_operations(None).load, wgpu::LoadOp::Load);
    }

    #[test]
    fn test_depth_stencil_operations() {
        let clear = ClearRequest {
            color: None,
            depth_stencil: Some((1.0, 0)),
        };
        let (depth, stencil) = depth_stencil_operations(Some(&clear));
        assert_eq!(depth.load, wgpu::LoadOp::Clear(1.0));
        assert_eq!(stencil.load, wgpu::LoadOp::Clear(0));

        let (depth, _) = depth_stencil_operations(None);
        assert_eq!(depth.load, wgpu::LoadOp::Load);
    }

    #[test]
    fn test_polygon_vertex_layout_matches_vertex_size() {
        use crate::dimension::{D2, D3, Dimension};
        assert_eq!(
            polygon_vertex_layout(DimensionKind::Two).array_stride,
            size_of::<<D2 as Dimension>::Vertex>() as u64
        );
        assert_eq!(
            polygon_vertex_layout(DimensionKind::Three).array_stride,
            size_of::<<D3 as Dimension>::Vertex>() as u64
        );
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn test_wgpu_device_buffers() {
        let context = GraphicsContext::new_owned_sync().unwrap();
        let device = WgpuDevice::new(context);

        let storage = device
            .create_buffer(&BufferDesc::new("test::storage", BufferKind::Storage, 16, 4))
            .unwrap();
        let staging = device
            .create_buffer(&BufferDesc::new("test::staging", BufferKind::Staging, 16, 4))
            .unwrap();
        assert_eq!(storage.size(), 64);

        device.write_buffer(&staging, 0, &[7u8; 64]).unwrap();
        device.flush_buffer(&staging).unwrap();

        let descriptor = device
            .write_storage_descriptor(
                &StorageDescriptorDesc {
                    label: "test::descriptor",
                    buffers: &[&storage],
                },
                None,
            )
            .unwrap();
        assert!(!descriptor.is_mock());

        let mut transfer = WgpuTransferRecorder::new(device.context(), "test::transfer");
        transfer.copy_buffer(&staging, &storage, 64);
        device.context().queue.submit([transfer.finish()]);
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn test_oversized_buffer_is_out_of_memory() {
        let context = GraphicsContext::new_owned_sync().unwrap();
        let limit = context.max_buffer_size();
        let device = WgpuDevice::new(context);

        let err = device
            .create_buffer(&BufferDesc::new("test::huge", BufferKind::Storage, limit, 2))
            .unwrap_err();
        assert_eq!(err, GpuError::OutOfMemory { requested: limit * 2 });
    }
}
