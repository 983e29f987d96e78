//! The top-level renderer and its per-frame protocol.
//!
//! A [`Renderer`] owns every [`RenderContext`] of one dimension and drives them through the
//! frame in a fixed order:
//!
//! 1. [`grow_to_fit`](Renderer::grow_to_fit) reallocates device buffers that are too small.
//! 2. [`send_to_device`](Renderer::send_to_device) writes host data into staging buffers.
//! 3. [`record_copy_commands`](Renderer::record_copy_commands) records staging to device
//!    copies and their barriers, and returns the stages the graphics submission waits on.
//! 4. [`render`](Renderer::render) draws the four stencil passes for every camera.
//!
//! [`flush`](Renderer::flush) then readies all contexts for the next frame's draw calls.
//!
//! # Example
//!
//! ```
//! # use std::sync::Arc;
//! use onyx_render::{
//!     BatchTable, CameraInfo, Color, D2, GeometryBuffers, InlineTaskManager, MeshLayout,
//!     Renderer, RendererConfig, ScissorRect, ViewMask, Viewport,
//! };
//! use onyx_test_utils::{MockCommandRecorder, MockGpuDevice};
//!
//! let device = Arc::new(MockGpuDevice::new());
//! let mut table = BatchTable::builder();
//! let quad = table.add_static_mesh(MeshLayout { first_index: 0, index_count: 6, vertex_offset: 0 });
//! table.static_mesh_buffers(GeometryBuffers::new(device.as_ref(), "quad", 64, 24).unwrap());
//!
//! let mut renderer = Renderer::<D2>::with_task_manager(
//!     device,
//!     Arc::new(table.build()),
//!     Arc::new(InlineTaskManager),
//!     RendererConfig::default(),
//! );
//!
//! let window = ViewMask::bit(0);
//! let id = renderer.create_context().unwrap();
//! let context = renderer.context_mut(id).unwrap();
//! context.add_target(&window);
//! context.fill(Color::WHITE);
//! context.static_mesh(quad);
//!
//! let mut transfer = MockCommandRecorder::new();
//! let mut graphics = MockCommandRecorder::new();
//! renderer.grow_to_fit(0).unwrap();
//! renderer.send_to_device(0).unwrap();
//! renderer.record_copy_commands(0, &mut graphics, &mut transfer).unwrap();
//!
//! let camera = CameraInfo::new(
//!     glam::Mat4::IDENTITY,
//!     Viewport::new(0.0, 0.0, 640.0, 480.0),
//!     ScissorRect::new(0, 0, 640, 480),
//! );
//! let stats = renderer.render(0, &mut graphics, window, &[camera]).unwrap();
//! assert_eq!(stats.draw_calls, 1);
//! renderer.flush();
//! ```

use std::sync::Arc;

use onyx_core::profiling::{profile_function, profile_scope};
use onyx_test_utils::{BufferBarrier, CommandRecorder, GpuDevice};

use crate::assets::AssetRegistry;
use crate::camera::CameraInfo;
use crate::config::{RendererConfig, TransferMode};
use crate::copy::{CopyInfo, PipelineStages};
use crate::dimension::Dimension;
use crate::error::{RenderError, Result};
use crate::frame::FrameStats;
use crate::render_context::RenderContext;
use crate::stencil::StencilPass;
use crate::target::ViewMask;
use crate::task::{TaskManager, TaskPool, UploadJob, run_upload_tasks};

/// Identifies a context owned by a [`Renderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(usize);

impl ContextId {
    pub fn index(self) -> usize {
        self.0
    }
}

pub struct Renderer<D: Dimension> {
    device: Arc<dyn GpuDevice>,
    registry: Arc<dyn AssetRegistry>,
    tasks: Arc<dyn TaskManager>,
    config: RendererConfig,
    contexts: Vec<Option<RenderContext<D>>>,
    last_uploads: usize,
}

impl<D: Dimension> Renderer<D> {
    /// Create a renderer that uploads on its own [`TaskPool`].
    ///
    /// # Panics
    ///
    /// Panics if `config` is invalid.
    pub fn new(device: Arc<dyn GpuDevice>, registry: Arc<dyn AssetRegistry>, config: RendererConfig) -> Self {
        config.validate();
        let threads = config
            .worker_threads
            .unwrap_or_else(TaskPool::default_thread_count);
        let tasks = Arc::new(TaskPool::new(threads));
        Self::with_task_manager(device, registry, tasks, config)
    }

    pub fn with_task_manager(
        device: Arc<dyn GpuDevice>,
        registry: Arc<dyn AssetRegistry>,
        tasks: Arc<dyn TaskManager>,
        config: RendererConfig,
    ) -> Self {
        config.validate();
        tracing::info!(
            "Created {:?} renderer ({} frames in flight, {:?} transfers)",
            D::KIND,
            config.frames_in_flight,
            config.transfer_mode
        );
        Self {
            device,
            registry,
            tasks,
            config,
            contexts: Vec::new(),
            last_uploads: 0,
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    // --- Contexts ----------------------------------------------------------------------------

    pub fn create_context(&mut self) -> Result<ContextId> {
        let context = RenderContext::new(self.device.clone(), self.registry.clone(), &self.config)?;
        let slot = self.contexts.iter().position(Option::is_none);
        let index = match slot {
            Some(index) => {
                self.contexts[index] = Some(context);
                index
            }
            None => {
                self.contexts.push(Some(context));
                self.contexts.len() - 1
            }
        };
        tracing::debug!("Created render context {}", index);
        Ok(ContextId(index))
    }

    pub fn context(&self, id: ContextId) -> Option<&RenderContext<D>> {
        self.contexts.get(id.0).and_then(Option::as_ref)
    }

    pub fn context_mut(&mut self, id: ContextId) -> Option<&mut RenderContext<D>> {
        self.contexts.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Remove a context. Its slot may be reused by a later [`create_context`](Self::create_context).
    pub fn destroy_context(&mut self, id: ContextId) -> Option<RenderContext<D>> {
        let context = self.contexts.get_mut(id.0)?.take();
        if context.is_some() {
            tracing::debug!("Destroyed render context {}", id.0);
        }
        context
    }

    pub fn context_count(&self) -> usize {
        self.contexts.iter().flatten().count()
    }

    fn contexts(&self) -> impl Iterator<Item = &RenderContext<D>> {
        self.contexts.iter().flatten()
    }

    fn check_frame(&self, frame: usize) -> Result<()> {
        if frame >= self.config.frames_in_flight {
            return Err(RenderError::FrameIndexOutOfRange {
                index: frame,
                frames: self.config.frames_in_flight,
            });
        }
        Ok(())
    }

    // --- Frame protocol ----------------------------------------------------------------------

    pub fn grow_to_fit(&mut self, frame: usize) -> Result<()> {
        profile_function!();
        self.check_frame(frame)?;
        for context in self.contexts.iter_mut().flatten() {
            context.grow_to_fit(frame)?;
        }
        Ok(())
    }

    /// Write this frame's host data into the staging buffers.
    ///
    /// Blocks until every upload has completed.
    pub fn send_to_device(&mut self, frame: usize) -> Result<()> {
        profile_function!();
        self.check_frame(frame)?;

        let mut jobs: Vec<UploadJob> = Vec::new();
        for context in self.contexts.iter_mut().flatten() {
            context.upload_jobs(frame, &mut jobs)?;
        }

        self.last_uploads = jobs.len();
        tracing::trace!("Running {} upload jobs for frame {}", jobs.len(), frame);
        run_upload_tasks(self.tasks.as_ref(), jobs)
    }

    /// Record the copies of this frame's uploads.
    ///
    /// Copies go to `transfer`. Acquire barriers go to `graphics`. With
    /// [`TransferMode::Separate`] matching release barriers are recorded on `transfer` after
    /// the copies. The returned stages must be waited on by the graphics submission.
    pub fn record_copy_commands(
        &self,
        frame: usize,
        graphics: &mut dyn CommandRecorder,
        transfer: &mut dyn CommandRecorder,
    ) -> Result<PipelineStages> {
        profile_function!();
        self.check_frame(frame)?;

        let mut releases: Vec<BufferBarrier> = Vec::new();
        let (stages, acquires) = {
            let release_sink = match self.config.transfer_mode {
                TransferMode::Separate => Some(&mut releases),
                TransferMode::Unified => None,
            };
            let mut info = CopyInfo::new(frame, &mut *transfer, release_sink);
            for context in self.contexts() {
                context.record_copy_commands(frame, &mut info)?;
            }
            tracing::trace!(
                "Recorded {} copies ({} bytes) for frame {}",
                info.copy_count(),
                info.copied_bytes(),
                frame
            );
            (info.wait_stages(), info.take_acquires())
        };

        if !releases.is_empty() {
            transfer.buffer_barriers(&releases);
        }
        if !acquires.is_empty() {
            graphics.buffer_barriers(&acquires);
        }
        Ok(stages)
    }

    /// Draw every context routed to `target` once per camera.
    ///
    /// An empty camera list records nothing.
    ///
    /// Each camera starts with [`CommandRecorder::clear`], which has to reset the color
    /// target and, in 3D, depth and stencil. Recorders that cannot clear mid-pass, such as
    /// [`WgpuPassRecorder`](crate::wgpu_backend::WgpuPassRecorder), must be given one
    /// camera per call, inside a render pass whose load operations come from
    /// [`color_operations`](crate::wgpu_backend::color_operations) and
    /// [`depth_stencil_operations`](crate::wgpu_backend::depth_stencil_operations).
    /// Passing several cameras to such a recorder leaves the stencil values of the previous
    /// camera in place and corrupts its outlines.
    pub fn render(
        &self,
        frame: usize,
        recorder: &mut dyn CommandRecorder,
        target: ViewMask,
        cameras: &[CameraInfo],
    ) -> Result<FrameStats> {
        profile_function!();
        self.check_frame(frame)?;

        let mut stats = FrameStats {
            uploads: self.last_uploads,
            ..Default::default()
        };

        for camera in cameras {
            profile_scope!("camera");
            if !camera.transparent {
                recorder.clear(&D::clear_request(camera));
            }
            recorder.set_viewport(&camera.viewport);
            recorder.set_scissor(&camera.scissor);

            for pass in StencilPass::ALL {
                for context in self.contexts().filter(|c| c.renders_to(target)) {
                    context.render_pass(frame, pass, camera, recorder, &mut stats)?;
                }
            }
        }
        Ok(stats)
    }

    /// Reset every context for the next frame.
    ///
    /// # Panics
    ///
    /// Panics if a context has an unmatched `push()`.
    pub fn flush(&mut self) {
        profile_function!();
        for context in self.contexts.iter_mut().flatten() {
            context.flush();
        }
    }
}
