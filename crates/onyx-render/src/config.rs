//! Renderer configuration.

/// Upper bound on [`RendererConfig::frames_in_flight`].
pub const MAX_FRAMES_IN_FLIGHT: usize = 3;

/// Vertices drawn per circle instance (a full-screen-aligned quad).
pub const DEFAULT_CIRCLE_VERTICES: u32 = 6;

/// Whether uploads run on a queue family separate from graphics.
///
/// With [`TransferMode::Separate`] copy recording emits release barriers on the transfer
/// stream in addition to the acquire barriers on the graphics stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferMode {
    #[default]
    Unified,
    Separate,
}

/// Configuration shared by a [`Renderer`](crate::Renderer) and its contexts.
///
/// # Example
///
/// ```
/// use onyx_render::{RendererConfig, TransferMode};
///
/// let config = RendererConfig {
///     frames_in_flight: 3,
///     transfer_mode: TransferMode::Separate,
///     ..Default::default()
/// };
/// assert_eq!(config.initial_capacity, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererConfig {
    /// Number of frame slots each device buffer is replicated over (1..=3).
    pub frames_in_flight: usize,
    /// Instance capacity of freshly created device buffers.
    pub initial_capacity: usize,
    /// Upload worker threads. `None` uses all cores but one.
    pub worker_threads: Option<usize>,
    pub transfer_mode: TransferMode,
    /// Prefix of every GPU object label.
    pub label_prefix: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            initial_capacity: 4,
            worker_threads: None,
            transfer_mode: TransferMode::default(),
            label_prefix: "onyx".to_string(),
        }
    }
}

impl RendererConfig {
    /// Panics on values the renderer cannot work with.
    pub fn validate(&self) {
        assert!(
            (1..=MAX_FRAMES_IN_FLIGHT).contains(&self.frames_in_flight),
            "frames_in_flight must be between 1 and {MAX_FRAMES_IN_FLIGHT}, got {}",
            self.frames_in_flight
        );
        if self.worker_threads == Some(0) {
            panic!("TaskPool must have at least one thread");
        }
    }

    pub fn label(&self, name: &str) -> String {
        format!("{}::{}", self.label_prefix, name)
    }
}
