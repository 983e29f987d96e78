//! GPU capability interface for the Onyx renderer.
//!
//! The renderer never talks to a graphics API directly. It consumes two traits:
//!
//! - [`GpuDevice`] - buffer creation, host writes, flushes and descriptor writes
//! - [`CommandRecorder`] - copy, barrier, bind and draw commands
//!
//! Both are implemented for `wgpu` by `onyx-render`, and by `MockGpuDevice` /
//! `MockCommandRecorder` here (requires the `mock` feature).
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "mock")]
//! # {
//! use onyx_test_utils::{BufferDesc, BufferKind, GpuDevice, MockGpuDevice};
//!
//! let mock = MockGpuDevice::new();
//!
//! let buffer = mock
//!     .create_buffer(&BufferDesc::new("instances", BufferKind::Storage, 32, 4))
//!     .unwrap();
//! mock.write_buffer(&buffer, 0, &[0u8; 64]).unwrap();
//!
//! assert_eq!(mock.count_buffer_creates(), 1);
//! assert_eq!(buffer.size(), 128);
//! assert!(buffer.is_mock());
//! # }
//! ```
//!
//! # Design
//!
//! GPU handles are owned wrappers, cheap to clone, with no lifetimes. Devices take `&self`
//! so they can be shared behind an `Arc` with upload tasks running on worker threads; mock
//! implementations use `Mutex` for interior mutability.

pub mod command;
pub mod device;
pub mod error;
pub mod gpu_types;
#[cfg(feature = "mock")]
pub mod mock_render;

pub use command::*;
pub use device::*;
pub use error::*;
pub use gpu_types::*;
#[cfg(feature = "mock")]
pub use mock_render::*;
