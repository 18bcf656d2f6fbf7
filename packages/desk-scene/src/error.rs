//! Library error type.

use thiserror::Error;

/// Errors surfaced to the host. The per-frame path never produces these.
#[derive(Debug, Error)]
pub enum SceneError {
    /// No GPU adapter / device could be acquired for the renderer.
    #[error("failed to acquire renderer: {0}")]
    Renderer(String),

    /// The output surface could not be created for the container.
    #[error("failed to create output surface: {0}")]
    Surface(String),

    /// Copying a rendered frame back to the CPU failed.
    #[error("frame readback failed: {0}")]
    Readback(String),

    #[error("invalid scene config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

impl From<wgpu::RequestDeviceError> for SceneError {
    fn from(err: wgpu::RequestDeviceError) -> Self {
        SceneError::Renderer(err.to_string())
    }
}

impl From<wgpu::CreateSurfaceError> for SceneError {
    fn from(err: wgpu::CreateSurfaceError) -> Self {
        SceneError::Surface(err.to_string())
    }
}

impl From<wgpu::BufferAsyncError> for SceneError {
    fn from(err: wgpu::BufferAsyncError) -> Self {
        SceneError::Readback(err.to_string())
    }
}
