//! Common contract of the per-pass geometry renderers.

use crate::copy::CopyInfo;
use crate::error::Result;
use crate::frame::PassInfo;
use crate::task::UploadJob;

/// One stencil pass worth of instances of a geometry family.
///
/// Every method is a no-op while the renderer holds no instances, so the render group can
/// forward to all four passes unconditionally.
pub trait GeometryRenderer: Send + Sync {
    /// Forget all instances. Device capacity is kept.
    fn flush(&mut self);

    fn instance_count(&self) -> usize;

    fn has_instances(&self) -> bool {
        self.instance_count() > 0
    }

    /// Grow the device buffers of `frame` to the recorded instance count.
    fn grow_to_fit(&mut self, frame: usize) -> Result<()>;

    /// Append the jobs writing this frame's host data into staging memory.
    fn upload_jobs(&self, frame: usize, jobs: &mut Vec<UploadJob>) -> Result<()>;

    fn record_copy_commands(&self, frame: usize, info: &mut CopyInfo<'_>) -> Result<()>;

    fn render(&self, info: &mut PassInfo<'_>) -> Result<()>;
}
