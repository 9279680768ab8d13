//! Rendering pipeline for eitmirror-rs.
//!
//! This crate turns decoded impedance meshes into draw calls:
//! - [`ImpedanceRenderer`]: owns the accepted mesh and colors, fits them into a
//!   host rectangle and issues uploads and draws against a [`RenderBackend`]
//! - [`UpdateHandle`]: weak, thread-safe entry point for network updates
//! - [`RecordingBackend`]: records every backend call, for tests and debugging
//! - [`WgpuBackend`]: wgpu implementation, embedded or headless

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
// Pixel and vertex counts are converted between usize, u32 and f32 on purpose
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod backend;
pub mod buffer;
pub mod error;
pub mod recording;
pub mod renderer;
pub mod screenshot;
pub mod wgpu_backend;

pub use backend::{LineDraw, MeshDraw, RenderBackend};
pub use error::{ConstructionError, RenderError, RenderResult, UpdateError};
pub use recording::{CommandLog, DrawCommand, RecordedMesh, RecordingBackend};
pub use renderer::{ImpedanceRenderer, UpdateHandle};
pub use screenshot::{encode_png, save_image, ScreenshotError};
pub use wgpu_backend::{DrawUniforms, GpuMesh, WgpuBackend};
