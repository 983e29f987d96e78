use std::fmt;

/// Errors reported by a [`GpuDevice`](crate::GpuDevice).
///
/// None of these are retried by the renderer; they are propagated to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// The allocator could not satisfy a request of `requested` bytes.
    OutOfMemory { requested: u64 },
    /// Buffer creation failed for a reason other than memory exhaustion.
    BufferCreation(String),
    /// A write of `len` bytes at `offset` does not fit in a buffer of `size` bytes.
    WriteOutOfRange { offset: u64, len: u64, size: u64 },
    /// Flushing host writes to the device failed.
    FlushFailed(String),
    /// Writing a descriptor (bind group) failed.
    DescriptorWrite(String),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::OutOfMemory { requested } => {
                write!(f, "Out of GPU memory: failed to allocate {} bytes", requested)
            }
            GpuError::BufferCreation(msg) => write!(f, "Buffer creation failed: {}", msg),
            GpuError::WriteOutOfRange { offset, len, size } => write!(
                f,
                "Write of {} bytes at offset {} overruns a {} byte buffer",
                len, offset, size
            ),
            GpuError::FlushFailed(msg) => write!(f, "Buffer flush failed: {}", msg),
            GpuError::DescriptorWrite(msg) => write!(f, "Descriptor write failed: {}", msg),
        }
    }
}

impl std::error::Error for GpuError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = GpuError::OutOfMemory { requested: 256 };
        assert_eq!(err.to_string(), "Out of GPU memory: failed to allocate 256 bytes");
        assert!(
            GpuError::DescriptorWrite("stale".into())
                .to_string()
                .contains("stale")
        );
        assert_eq!(
            GpuError::WriteOutOfRange {
                offset: 8,
                len: 16,
                size: 16
            }
            .to_string(),
            "Write of 16 bytes at offset 8 overruns a 16 byte buffer"
        );
    }
}
