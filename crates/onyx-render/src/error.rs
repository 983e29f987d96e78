use onyx_test_utils::GpuError;

/// Errors returned by the per-frame protocol.
///
/// Contract violations (unbalanced `push`/`pop`, degenerate polygons, unknown meshes) are
/// panics instead; this type only covers failures reported by the GPU layer at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The GPU layer failed (allocation, flush or descriptor write).
    Gpu(GpuError),
    /// A frame index outside `0..frames_in_flight` was passed.
    FrameIndexOutOfRange { index: usize, frames: usize },
    /// An upload job panicked or was dropped before completing.
    TaskFailed(String),
    /// No adapter or device could be created.
    Backend(String),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Gpu(err) => write!(f, "GPU error: {}", err),
            RenderError::FrameIndexOutOfRange { index, frames } => write!(
                f,
                "Frame index {} out of range ({} frames in flight)",
                index, frames
            ),
            RenderError::TaskFailed(msg) => write!(f, "Upload task failed: {}", msg),
            RenderError::Backend(msg) => write!(f, "Graphics backend unavailable: {}", msg),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Gpu(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GpuError> for RenderError {
    fn from(err: GpuError) -> Self {
        RenderError::Gpu(err)
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_gpu_error_source() {
        let err: RenderError = GpuError::OutOfMemory { requested: 64 }.into();
        assert!(err.source().is_some());
        assert!(err.to_string().contains("64 bytes"));
    }

    #[test]
    fn test_frame_index_display() {
        let err = RenderError::FrameIndexOutOfRange { index: 3, frames: 2 };
        assert_eq!(
            err.to_string(),
            "Frame index 3 out of range (2 frames in flight)"
        );
    }
}
