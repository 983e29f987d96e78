use std::sync::Arc;

use onyx_test_utils::GpuDevice;

use crate::assets::{AssetRegistry, GeometryKind};
use crate::config::RendererConfig;
use crate::copy::CopyInfo;
use crate::device_data::DeviceData;
use crate::error::Result;
use crate::frame::PassInfo;
use crate::instance::InstanceLayout;
use crate::pipeline::GeometryFamily;
use crate::task::UploadJob;

use super::GeometryRenderer;

/// Instanced renderer of registry geometry (static meshes or primitives).
///
/// Instances are bucketed by batch index so each mesh is drawn with a single call, and all
/// buckets share one storage buffer addressed through `first_instance`.
pub struct MeshRenderer<I: InstanceLayout> {
    registry: Arc<dyn AssetRegistry>,
    kind: GeometryKind,
    buckets: Vec<Arc<Vec<I>>>,
    count: usize,
    data: DeviceData<I>,
}

impl<I: InstanceLayout> MeshRenderer<I> {
    pub fn new(
        device: Arc<dyn GpuDevice>,
        registry: Arc<dyn AssetRegistry>,
        kind: GeometryKind,
        label: impl Into<String>,
        config: &RendererConfig,
    ) -> Result<Self> {
        let data = DeviceData::storage(
            device,
            label,
            config.frames_in_flight,
            config.initial_capacity,
        )?;
        Ok(Self {
            registry,
            kind,
            buckets: Vec::new(),
            count: 0,
            data,
        })
    }

    /// Append an instance of the mesh at absolute batch index `batch`.
    pub fn draw(&mut self, batch: u32, instance: I) {
        let start = self.registry.batch_start(self.kind);
        debug_assert!(
            batch >= start && batch < self.registry.batch_end(self.kind),
            "Batch {batch} is outside the {:?} range",
            self.kind
        );
        let bucket = (batch - start) as usize;
        if bucket >= self.buckets.len() {
            self.buckets.resize_with(bucket + 1, Default::default);
        }
        Arc::make_mut(&mut self.buckets[bucket]).push(instance);
        self.count += 1;
    }

    /// Instances recorded for the mesh at `batch`.
    pub fn instances(&self, batch: u32) -> &[I] {
        let bucket = (batch - self.registry.batch_start(self.kind)) as usize;
        self.buckets
            .get(bucket)
            .map(|bucket| bucket.as_slice())
            .unwrap_or_default()
    }

    /// All instances in upload order.
    pub fn iter(&self) -> impl Iterator<Item = &I> {
        self.buckets.iter().flat_map(|bucket| bucket.iter())
    }

    pub fn device_data(&self) -> &DeviceData<I> {
        &self.data
    }
}

impl<I: InstanceLayout> GeometryRenderer for MeshRenderer<I> {
    fn flush(&mut self) {
        for bucket in &mut self.buckets {
            Arc::make_mut(bucket).clear();
        }
        self.count = 0;
    }

    fn instance_count(&self) -> usize {
        self.count
    }

    fn grow_to_fit(&mut self, frame: usize) -> Result<()> {
        self.data.ensure_capacity(frame, self.count)?;
        Ok(())
    }

    fn upload_jobs(&self, frame: usize, jobs: &mut Vec<UploadJob>) -> Result<()> {
        if self.has_instances() {
            jobs.push(self.data.upload_job(frame, self.buckets.clone())?);
        }
        Ok(())
    }

    fn record_copy_commands(&self, frame: usize, info: &mut CopyInfo<'_>) -> Result<()> {
        if self.has_instances() {
            self.data.record_copy(frame, self.count, info)?;
        }
        Ok(())
    }

    fn render(&self, info: &mut PassInfo<'_>) -> Result<()> {
        if !self.has_instances() {
            return Ok(());
        }

        let Some(buffers) = self.registry.geometry_buffers(self.kind) else {
            tracing::warn!(
                "Skipping {} {:?} instances: no geometry buffers registered",
                self.count,
                self.kind
            );
            return Ok(());
        };

        info.bind(GeometryFamily::Mesh, self.data.storage_descriptor(info.frame)?);
        info.bind_geometry(&buffers.vertices, &buffers.indices);

        let start = self.registry.batch_start(self.kind);
        let mut first_instance = 0u32;
        for (bucket, instances) in self.buckets.iter().enumerate() {
            if instances.is_empty() {
                continue;
            }
            let layout = self.registry.mesh_layout(start + bucket as u32);
            let count = instances.len() as u32;
            info.draw_indexed(
                layout.index_count,
                count,
                layout.first_index,
                layout.vertex_offset,
                first_instance,
            );
            first_instance += count;
        }
        Ok(())
    }
}
