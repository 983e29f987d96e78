use std::sync::Arc;

use bytemuck::Pod;
use onyx_test_utils::{BufferKind, GpuDevice};

use crate::config::RendererConfig;
use crate::copy::CopyInfo;
use crate::device_data::DeviceData;
use crate::error::Result;
use crate::frame::PassInfo;
use crate::instance::{InstanceLayout, PolygonLayout};
use crate::pipeline::GeometryFamily;
use crate::task::UploadJob;

use super::GeometryRenderer;

/// Fan triangulation of a convex polygon with `vertex_count` vertices.
///
/// Produces `(0, 1, 2)` followed by `(0, i - 1, i)` for every further vertex.
pub fn fan_indices(vertex_count: u32) -> impl Iterator<Item = u32> {
    (2..vertex_count).flat_map(|i| [0, i - 1, i])
}

/// Arbitrary convex polygons.
///
/// Each polygon carries its own geometry, so instances cannot share a draw: every polygon is
/// one indexed draw over its slice of the vertex and index buffers.
pub struct PolygonRenderer<V: Pod + Send + Sync, I: InstanceLayout> {
    instances: Arc<Vec<I>>,
    layouts: Vec<PolygonLayout>,
    vertices: Arc<Vec<V>>,
    indices: Arc<Vec<u32>>,
    instance_data: DeviceData<I>,
    vertex_data: DeviceData<V>,
    index_data: DeviceData<u32>,
}

impl<V: Pod + Send + Sync, I: InstanceLayout> PolygonRenderer<V, I> {
    pub fn new(
        device: Arc<dyn GpuDevice>,
        label: impl Into<String>,
        config: &RendererConfig,
    ) -> Result<Self> {
        let label = label.into();
        let frames = config.frames_in_flight;
        let capacity = config.initial_capacity;
        Ok(Self {
            instances: Arc::default(),
            layouts: Vec::new(),
            vertices: Arc::default(),
            indices: Arc::default(),
            instance_data: DeviceData::storage(device.clone(), label.clone(), frames, capacity)?,
            vertex_data: DeviceData::unbound(
                device.clone(),
                format!("{label}::vertices"),
                BufferKind::Vertex,
                frames,
                capacity * 4,
            )?,
            index_data: DeviceData::unbound(
                device,
                format!("{label}::indices"),
                BufferKind::Index,
                frames,
                capacity * 6,
            )?,
        })
    }

    /// Triangulate `vertices` and append them with `instance`.
    ///
    /// # Panics
    ///
    /// Panics if fewer than 3 vertices are given.
    pub fn draw(&mut self, instance: I, vertices: &[V]) {
        assert!(vertices.len() >= 3, "A polygon must have at least 3 vertices");

        let vertex_count = vertices.len() as u32;
        let layout = PolygonLayout {
            vertices_start: self.vertices.len() as u32,
            indices_start: self.indices.len() as u32,
            indices_size: 3 * (vertex_count - 2),
        };

        Arc::make_mut(&mut self.vertices).extend_from_slice(vertices);
        Arc::make_mut(&mut self.indices).extend(fan_indices(vertex_count));
        Arc::make_mut(&mut self.instances).push(instance);
        self.layouts.push(layout);
    }

    pub fn instances(&self) -> &[I] {
        &self.instances
    }

    pub fn layouts(&self) -> &[PolygonLayout] {
        &self.layouts
    }

    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }
}

impl<V: Pod + Send + Sync, I: InstanceLayout> GeometryRenderer for PolygonRenderer<V, I> {
    fn flush(&mut self) {
        Arc::make_mut(&mut self.instances).clear();
        Arc::make_mut(&mut self.vertices).clear();
        Arc::make_mut(&mut self.indices).clear();
        self.layouts.clear();
    }

    fn instance_count(&self) -> usize {
        self.instances.len()
    }

    fn grow_to_fit(&mut self, frame: usize) -> Result<()> {
        self.instance_data.ensure_capacity(frame, self.instances.len())?;
        self.vertex_data.ensure_capacity(frame, self.vertices.len())?;
        self.index_data.ensure_capacity(frame, self.indices.len())?;
        Ok(())
    }

    fn upload_jobs(&self, frame: usize, jobs: &mut Vec<UploadJob>) -> Result<()> {
        if !self.has_instances() {
            return Ok(());
        }
        jobs.push(self.instance_data.upload_job(frame, vec![self.instances.clone()])?);
        jobs.push(self.vertex_data.upload_job(frame, vec![self.vertices.clone()])?);
        jobs.push(self.index_data.upload_job(frame, vec![self.indices.clone()])?);
        Ok(())
    }

    fn record_copy_commands(&self, frame: usize, info: &mut CopyInfo<'_>) -> Result<()> {
        if !self.has_instances() {
            return Ok(());
        }
        self.instance_data
            .record_copy(frame, self.instances.len(), info)?;
        self.vertex_data.record_copy(frame, self.vertices.len(), info)?;
        self.index_data.record_copy(frame, self.indices.len(), info)?;
        Ok(())
    }

    fn render(&self, info: &mut PassInfo<'_>) -> Result<()> {
        if !self.has_instances() {
            return Ok(());
        }
        let frame = info.frame;
        info.bind(
            GeometryFamily::Polygon,
            self.instance_data.storage_descriptor(frame)?,
        );
        info.bind_geometry(self.vertex_data.buffer(frame)?, self.index_data.buffer(frame)?);

        for (instance, layout) in self.layouts.iter().enumerate() {
            info.draw_indexed(
                layout.indices_size,
                1,
                layout.indices_start,
                layout.vertices_start as i32,
                instance as u32,
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::dimension::{D2, Dimension, PolygonVertex2D};
    use crate::instance::InstanceData2D;
    use glam::{Mat3, Vec2};
    use onyx_test_utils::{BarrierStage, MockCommandRecorder, MockGpuDevice};

    type Renderer2D = PolygonRenderer<PolygonVertex2D, InstanceData2D>;

    fn renderer() -> Renderer2D {
        PolygonRenderer::new(
            Arc::new(MockGpuDevice::new()),
            "polygon",
            &RendererConfig::default(),
        )
        .unwrap()
    }

    fn ngon(n: usize) -> Vec<PolygonVertex2D> {
        (0..n)
            .map(|i| {
                let angle = i as f32 / n as f32 * std::f32::consts::TAU;
                D2::polygon_vertex(Vec2::from_angle(angle))
            })
            .collect()
    }

    #[test]
    fn test_fan_indices() {
        assert_eq!(fan_indices(3).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(
            fan_indices(5).collect::<Vec<_>>(),
            vec![0, 1, 2, 0, 2, 3, 0, 3, 4]
        );
    }

    #[test]
    fn test_fan_triangulation_properties() {
        for n in 3..20u32 {
            let indices: Vec<_> = fan_indices(n).collect();
            assert_eq!(indices.len() as u32, 3 * (n - 2));
            assert!(indices.iter().all(|&i| i < n));
            assert!(indices.chunks(3).all(|triangle| triangle.contains(&0)));
        }
    }

    #[test]
    fn test_layouts_are_contiguous() {
        let mut renderer = renderer();
        let instance = InstanceData2D::fill(&Mat3::IDENTITY, Color::WHITE);
        renderer.draw(instance, &ngon(4));
        renderer.draw(instance, &ngon(3));

        assert_eq!(
            renderer.layouts(),
            &[
                PolygonLayout {
                    vertices_start: 0,
                    indices_start: 0,
                    indices_size: 6,
                },
                PolygonLayout {
                    vertices_start: 4,
                    indices_start: 6,
                    indices_size: 3,
                },
            ]
        );
        assert_eq!(renderer.vertices().len(), 7);
        assert_eq!(renderer.indices().len(), 9);
    }

    #[test]
    #[should_panic(expected = "A polygon must have at least 3 vertices")]
    fn test_degenerate_polygon() {
        let mut renderer = renderer();
        renderer.draw(InstanceData2D::fill(&Mat3::IDENTITY, Color::WHITE), &ngon(2));
    }

    #[test]
    fn test_geometry_copies_wait_on_vertex_input() {
        let mut renderer = renderer();
        renderer.draw(InstanceData2D::fill(&Mat3::IDENTITY, Color::WHITE), &ngon(8));
        renderer.grow_to_fit(0).unwrap();

        let mut recorder = MockCommandRecorder::new();
        let mut info = CopyInfo::new(0, &mut recorder, None);
        renderer.record_copy_commands(0, &mut info).unwrap();

        assert_eq!(info.shader_acquires.len(), 1);
        assert_eq!(info.vertex_acquires.len(), 2);
        assert!(
            info.vertex_acquires
                .iter()
                .all(|barrier| barrier.stage == BarrierStage::VertexInput)
        );
    }
}
