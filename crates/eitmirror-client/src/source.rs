//! The data source seam used by the session.

use async_trait::async_trait;
use eitmirror_core::ElectrodesConfig;

use crate::client::MirrorClient;
use crate::error::ClientResult;

/// Anything that can serve the five mirror payloads.
///
/// [`MirrorClient`] is the production implementation; tests substitute scripted sources.
#[async_trait]
pub trait MirrorSource: Send + Sync {
    async fn electrodes_config(&self) -> ClientResult<ElectrodesConfig>;
    async fn vertices_config(&self) -> ClientResult<Vec<u8>>;
    async fn vertices_update(&self) -> ClientResult<Vec<u8>>;
    async fn color_config(&self) -> ClientResult<Vec<u8>>;
    async fn color_update(&self) -> ClientResult<Vec<u8>>;
}

#[async_trait]
impl MirrorSource for MirrorClient {
    async fn electrodes_config(&self) -> ClientResult<ElectrodesConfig> {
        self.request_electrodes_config().await
    }

    async fn vertices_config(&self) -> ClientResult<Vec<u8>> {
        self.request_vertices_config().await
    }

    async fn vertices_update(&self) -> ClientResult<Vec<u8>> {
        self.request_vertices_update().await
    }

    async fn color_config(&self) -> ClientResult<Vec<u8>> {
        self.request_color_config().await
    }

    async fn color_update(&self) -> ClientResult<Vec<u8>> {
        self.request_color_update().await
    }
}
