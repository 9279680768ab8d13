//! Core data model for eitmirror-rs.
//!
//! This crate provides the pieces of the impedance mirror that do not touch the GPU
//! or the network:
//! - Byte layouts of the host's vertex and color payloads
//! - [`MeshBuffer`] and [`ColorTable`] decoding with count validation
//! - Color maps and the clamping [`ColorMapper`]
//! - Fit-to-rect geometry and the electrode ring overlay
//! - Renderer options

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Counts and coordinates are converted between usize, u32 and f32 on purpose
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod color_maps;
pub mod color_table;
pub mod electrodes;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod mesh;
pub mod options;

pub use color_maps::{ColorMap, ColorMapRegistry, ColorMapper};
pub use color_table::{ColorTable, Rgba};
pub use electrodes::{ElectrodeRing, ElectrodesConfig};
pub use error::{DecodeError, DecodeResult};
pub use geometry::{Bounds, FitTransform, Rect};
pub use layout::{ByteOrder, ColorFormat, Dimensions, VertexLayout};
pub use mesh::{MeshBuffer, Vertex};
pub use options::{ColorSource, RendererOptions, ValueRange};

// Re-export glam types for convenience
pub use glam::{Vec2, Vec3, Vec4};
