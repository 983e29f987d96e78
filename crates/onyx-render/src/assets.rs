//! Read-only geometry registry consumed by the renderer.
//!
//! Static meshes and primitives live in shared vertex/index buffers owned by the asset
//! layer. The renderer only needs to map a handle to a batch index and a batch index to a
//! draw range, which is what [`AssetRegistry`] exposes.

use onyx_test_utils::{BufferDesc, BufferKind, GpuBuffer, GpuDevice};

use crate::error::Result;

/// Handle of a registered static mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Mesh(pub u32);

/// Handle of a registered primitive shape (square, cube, sphere...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Primitive(pub u32);

/// Families of batches, laid out contiguously in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    StaticMesh,
    Primitive,
    Circle,
}

/// Indexed draw range of one batch inside the shared geometry buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshLayout {
    pub first_index: u32,
    pub index_count: u32,
    pub vertex_offset: i32,
}

/// Shared vertex and index buffers of a geometry family.
#[derive(Debug, Clone)]
pub struct GeometryBuffers {
    pub vertices: GpuBuffer,
    pub indices: GpuBuffer,
}

impl GeometryBuffers {
    /// Allocate a vertex and an index buffer of the given byte sizes on `device`.
    pub fn new(
        device: &dyn GpuDevice,
        label: &str,
        vertex_bytes: u64,
        index_bytes: u64,
    ) -> Result<Self> {
        let vertices = device.create_buffer(&BufferDesc::new(
            format!("{label} vertices"),
            BufferKind::Vertex,
            1,
            vertex_bytes,
        ))?;
        let indices = device.create_buffer(&BufferDesc::new(
            format!("{label} indices"),
            BufferKind::Index,
            1,
            index_bytes,
        ))?;
        Ok(Self { vertices, indices })
    }
}

/// Lookup of batch indices and draw ranges.
///
/// Unknown handles are contract violations and panic.
pub trait AssetRegistry: Send + Sync {
    fn static_mesh_batch_index(&self, mesh: Mesh) -> u32;

    fn primitive_batch_index(&self, primitive: Primitive) -> u32;

    fn circle_batch_index(&self) -> u32;

    fn batch_start(&self, kind: GeometryKind) -> u32;

    fn batch_end(&self, kind: GeometryKind) -> u32;

    fn batch_count(&self, kind: GeometryKind) -> u32 {
        self.batch_end(kind) - self.batch_start(kind)
    }

    fn mesh_layout(&self, batch: u32) -> MeshLayout;

    fn geometry_buffers(&self, kind: GeometryKind) -> Option<GeometryBuffers>;
}

/// In-memory [`AssetRegistry`] with static meshes first, then primitives, then one circle
/// batch.
///
/// ```
/// use onyx_render::{AssetRegistry, BatchTable, GeometryKind, MeshLayout};
///
/// let mut builder = BatchTable::builder();
/// let square = builder.add_primitive(MeshLayout { first_index: 0, index_count: 6, vertex_offset: 0 });
/// let table = builder.build();
///
/// assert_eq!(table.primitive_batch_index(square), 0);
/// assert_eq!(table.batch_count(GeometryKind::Circle), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BatchTable {
    static_meshes: Vec<MeshLayout>,
    primitives: Vec<MeshLayout>,
    mesh_buffers: Option<GeometryBuffers>,
    primitive_buffers: Option<GeometryBuffers>,
}

#[derive(Debug, Default)]
pub struct BatchTableBuilder {
    table: BatchTable,
}

impl BatchTableBuilder {
    pub fn add_static_mesh(&mut self, layout: MeshLayout) -> Mesh {
        self.table.static_meshes.push(layout);
        Mesh(self.table.static_meshes.len() as u32 - 1)
    }

    pub fn add_primitive(&mut self, layout: MeshLayout) -> Primitive {
        self.table.primitives.push(layout);
        Primitive(self.table.primitives.len() as u32 - 1)
    }

    pub fn static_mesh_buffers(&mut self, buffers: GeometryBuffers) -> &mut Self {
        self.table.mesh_buffers = Some(buffers);
        self
    }

    pub fn primitive_buffers(&mut self, buffers: GeometryBuffers) -> &mut Self {
        self.table.primitive_buffers = Some(buffers);
        self
    }

    pub fn build(self) -> BatchTable {
        tracing::debug!(
            "Built batch table: {} static meshes, {} primitives",
            self.table.static_meshes.len(),
            self.table.primitives.len()
        );
        self.table
    }
}

impl BatchTable {
    pub fn builder() -> BatchTableBuilder {
        BatchTableBuilder::default()
    }
}

impl AssetRegistry for BatchTable {
    fn static_mesh_batch_index(&self, mesh: Mesh) -> u32 {
        assert!(
            (mesh.0 as usize) < self.static_meshes.len(),
            "Mesh handle {} is not registered ({} static meshes)",
            mesh.0,
            self.static_meshes.len()
        );
        mesh.0
    }

    fn primitive_batch_index(&self, primitive: Primitive) -> u32 {
        assert!(
            (primitive.0 as usize) < self.primitives.len(),
            "Primitive handle {} is not registered ({} primitives)",
            primitive.0,
            self.primitives.len()
        );
        self.batch_start(GeometryKind::Primitive) + primitive.0
    }

    fn circle_batch_index(&self) -> u32 {
        self.batch_start(GeometryKind::Circle)
    }

    fn batch_start(&self, kind: GeometryKind) -> u32 {
        match kind {
            GeometryKind::StaticMesh => 0,
            GeometryKind::Primitive => self.static_meshes.len() as u32,
            GeometryKind::Circle => (self.static_meshes.len() + self.primitives.len()) as u32,
        }
    }

    fn batch_end(&self, kind: GeometryKind) -> u32 {
        match kind {
            GeometryKind::StaticMesh => self.batch_start(GeometryKind::Primitive),
            GeometryKind::Primitive => self.batch_start(GeometryKind::Circle),
            GeometryKind::Circle => self.batch_start(GeometryKind::Circle) + 1,
        }
    }

    fn mesh_layout(&self, batch: u32) -> MeshLayout {
        let batch = batch as usize;
        if let Some(layout) = self.static_meshes.get(batch) {
            return *layout;
        }
        *self
            .primitives
            .get(batch - self.static_meshes.len())
            .unwrap_or_else(|| panic!("Batch {batch} has no mesh layout"))
    }

    fn geometry_buffers(&self, kind: GeometryKind) -> Option<GeometryBuffers> {
        match kind {
            GeometryKind::StaticMesh => self.mesh_buffers.clone(),
            GeometryKind::Primitive => self.primitive_buffers.clone(),
            GeometryKind::Circle => None,
        }
    }
}
