//! eitmirror-rs: mirror a remote EIT reconstruction.
//!
//! A host device publishes an impedance mesh (vertex positions with one impedance
//! value each), per-vertex colors and its electrode setup over HTTP. This crate
//! fetches them, decodes them and draws the mesh fitted into a rectangle, keeping
//! it current as updates arrive.
//!
//! # Quick Start
//!
//! ```no_run
//! use eitmirror::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let config = MirrorConfig::load(None)?;
//!     let backend = WgpuBackend::new_headless(512, 512).await?;
//!     let (session, mut renderer) = MirrorSession::connect(&config, backend).await?;
//!     let _updates = session.spawn_updates();
//!
//!     renderer.draw_in_rect(Rect::new(0.0, 0.0, 512.0, 512.0));
//!     Ok(())
//! }
//! ```
//!
//! # Crates
//!
//! - `eitmirror-core`: byte layouts, [`MeshBuffer`], [`ColorTable`], [`ColorMapper`]
//! - `eitmirror-render`: [`ImpedanceRenderer`] and its backends
//! - `eitmirror-client`: [`MirrorClient`]

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod session;

pub use config::{ConfigError, MirrorConfig, HOST_ENV};
pub use session::{MirrorSession, SessionError, SessionEvent, StopReason, UpdateTask};

// Re-export core types
pub use eitmirror_core::{
    ByteOrder, ColorFormat, ColorMap, ColorMapRegistry, ColorMapper, ColorSource, ColorTable,
    DecodeError, Dimensions, ElectrodeRing, ElectrodesConfig, FitTransform, MeshBuffer, Rect,
    RendererOptions, Rgba, ValueRange, Vec2, Vec3, Vertex, VertexLayout,
};

// Re-export render types
pub use eitmirror_render::{
    save_image, CommandLog, ConstructionError, DrawCommand, ImpedanceRenderer, RecordingBackend,
    RenderBackend, RenderError, UpdateError, UpdateHandle, WgpuBackend,
};

// Re-export client types
pub use eitmirror_client::{ClientError, Endpoint, MirrorClient, MirrorSource};

/// Initializes `env_logger` (honoring `RUST_LOG`). Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::try_init();
}
