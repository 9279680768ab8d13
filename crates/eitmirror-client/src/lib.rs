//! HTTP client for eitmirror-rs.
//!
//! [`MirrorClient`] fetches the host's electrodes, vertices and color payloads.
//! Every request is a single `GET` that resolves to exactly one result. Payloads
//! are returned as raw bytes and decoded by `eitmirror-core`, except the
//! electrodes config which is parsed here.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod client;
pub mod endpoint;
pub mod error;
pub mod source;

pub use client::MirrorClient;
pub use endpoint::Endpoint;
pub use error::{ClientError, ClientResult};
pub use source::MirrorSource;
