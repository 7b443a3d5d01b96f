//! Fatal error taxonomy for the rendering core.
//!
//! There is no soft-failure or degraded-rendering path: every variant below
//! aborts the frame, and nothing is retried. Construction-time correctness
//! is a precondition of steady-state rendering.

/// Errors that can abort a frame.
#[derive(Debug)]
pub enum RenderError {
    /// A device or surface resource could not be created or acquired.
    Resource(String),
    /// A mesh/shader/uniform mismatch that indicates an authoring bug,
    /// detected at draw time.
    Configuration(String),
    /// A render pass was entered while another pass was still active.
    PassOrdering(String),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Resource(msg) => write!(f, "resource failure: {}", msg),
            RenderError::Configuration(msg) => {
                write!(f, "configuration error: {}", msg)
            }
            RenderError::PassOrdering(msg) => {
                write!(f, "pass ordering violation: {}", msg)
            }
        }
    }
}

impl std::error::Error for RenderError {}

impl From<wgpu::SurfaceError> for RenderError {
    fn from(e: wgpu::SurfaceError) -> Self {
        RenderError::Resource(format!("surface error: {}", e))
    }
}
