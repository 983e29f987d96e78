//! Immediate-mode 2D and 3D rendering.
//!
//! Client code draws through a [`RenderContext`]: a stack of render states plus one
//! [`RenderGroup`](group::RenderGroup) per geometry family. Every draw call resolves into
//! instance records for up to two of the four [`StencilPass`]es. The [`Renderer`] uploads the
//! records once per frame and replays them, pass by pass, for each camera.
//!
//! The GPU is reached only through the [`GpuDevice`](onyx_test_utils::GpuDevice) and
//! [`CommandRecorder`](onyx_test_utils::CommandRecorder) traits. [`wgpu_backend`] implements
//! them on `wgpu`.

pub mod assets;
pub mod batched;
pub mod camera;
pub mod color;
pub mod config;
pub mod context;
pub mod copy;
pub mod device_data;
pub mod dimension;
pub mod error;
pub mod frame;
pub mod group;
pub mod instance;
pub mod light;
pub mod options;
pub mod pipeline;
pub mod render_context;
pub mod renderer;
pub mod state;
pub mod stencil;
pub mod target;
pub mod task;
pub mod wgpu_backend;

pub use assets::{AssetRegistry, BatchTable, BatchTableBuilder, GeometryBuffers, GeometryKind, Mesh, MeshLayout, Primitive};
pub use camera::{Camera, CameraInfo, ProjectionMode, ScissorRect, Viewport};
pub use color::Color;
pub use config::{DEFAULT_CIRCLE_VERTICES, MAX_FRAMES_IN_FLIGHT, RendererConfig, TransferMode};
pub use context::{GraphicsContext, GraphicsContextDescriptor};
pub use copy::{CopyInfo, PipelineStages};
pub use device_data::{DeviceData, grown_capacity};
pub use dimension::{D2, D3, Dimension, DimensionKind};
pub use error::{RenderError, Result};
pub use frame::FrameStats;
pub use instance::{CircleInstanceData, InstanceData2D, InstanceData3DFill, InstanceData3DStencil};
pub use light::{
    DirectionalLight, DirectionalLightHandle, LightSystem, PointLight, PointLightHandle, SceneLighting,
};
pub use options::{AxesOptions, CircleOptions};
pub use pipeline::{GeometryFamily, PipelineKey, PipelineSpec, Shading};
pub use render_context::RenderContext;
pub use renderer::{ContextId, Renderer};
pub use state::{MaterialData, RenderState, RenderStateFlags};
pub use stencil::{DrawMode, StencilPass, resolve_passes};
pub use target::{Target, ViewMask};
pub use task::{InlineTaskManager, TaskManager, TaskPool, run_upload_tasks};
