//! Rendering error types.

use eitmirror_core::DecodeError;
use thiserror::Error;

/// Errors that prevent a renderer from being constructed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstructionError {
    /// The initial vertices payload could not be decoded.
    #[error("invalid mesh: {0}")]
    InvalidMesh(#[from] DecodeError),

    /// The configured color map is not registered.
    #[error("unknown color map '{0}'")]
    UnknownColorMap(String),
}

/// Errors returned when applying an update.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpdateError {
    /// The update payload was rejected; the previous state is still displayed.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The renderer behind an [`UpdateHandle`](crate::UpdateHandle) no longer exists.
    #[error("renderer has been dropped")]
    RendererDropped,
}

/// Errors that can occur in the GPU backend.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Buffer creation failed.
    #[error("buffer creation failed: {0}")]
    BufferCreationFailed(String),

    /// The backend has no offscreen target to read back.
    #[error("no offscreen target to capture")]
    NoOffscreenTarget,

    /// Mapping the readback buffer failed.
    #[error("GPU buffer mapping failed")]
    BufferMapFailed,
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
