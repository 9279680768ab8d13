//! Mirror HTTP client.

use std::time::Duration;

use eitmirror_core::ElectrodesConfig;
use reqwest::Client;
use url::Url;

use crate::endpoint::Endpoint;
use crate::error::{ClientError, ClientResult};

const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Client for a single mirror host.
#[derive(Debug, Clone)]
pub struct MirrorClient {
    http: Client,
    host_address: Url,
}

impl MirrorClient {
    /// Creates a client with the default request timeout.
    pub fn new(host_address: Url) -> ClientResult<Self> {
        Self::with_timeout(host_address, Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }

    /// Creates a client whose requests give up after `timeout`.
    pub fn with_timeout(host_address: Url, timeout: Duration) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("eitmirror/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            host_address: normalize(host_address),
        })
    }

    /// The host address requests are resolved against.
    pub fn host_address(&self) -> &Url {
        &self.host_address
    }

    /// Points the client at another host. Requests already in flight are unaffected.
    pub fn set_host_address(&mut self, host_address: Url) {
        self.host_address = normalize(host_address);
        log::info!("mirror host set to {}", self.host_address);
    }

    /// Full URL of an endpoint.
    pub fn endpoint_url(&self, endpoint: Endpoint) -> ClientResult<Url> {
        Ok(self.host_address.join(endpoint.path())?)
    }

    /// Fetches the electrode count and length.
    pub async fn request_electrodes_config(&self) -> ClientResult<ElectrodesConfig> {
        let body = self.fetch(Endpoint::ElectrodesConfig).await?;
        Ok(ElectrodesConfig::from_json(&body)?)
    }

    /// Fetches the initial vertices payload.
    pub async fn request_vertices_config(&self) -> ClientResult<Vec<u8>> {
        self.fetch(Endpoint::VerticesConfig).await
    }

    /// Fetches the latest vertices payload.
    pub async fn request_vertices_update(&self) -> ClientResult<Vec<u8>> {
        self.fetch(Endpoint::VerticesUpdate).await
    }

    /// Fetches the initial color payload.
    pub async fn request_color_config(&self) -> ClientResult<Vec<u8>> {
        self.fetch(Endpoint::ColorsConfig).await
    }

    /// Fetches the latest color payload.
    pub async fn request_color_update(&self) -> ClientResult<Vec<u8>> {
        self.fetch(Endpoint::ColorsUpdate).await
    }

    async fn fetch(&self, endpoint: Endpoint) -> ClientResult<Vec<u8>> {
        let url = self.endpoint_url(endpoint)?;
        log::debug!("GET {url}");

        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        log::debug!("{endpoint}: {} bytes", body.len());
        Ok(body.to_vec())
    }
}

/// Makes sure the address path ends in `/` so endpoint paths are appended, not swapped in.
fn normalize(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(address: &str) -> MirrorClient {
        MirrorClient::new(Url::parse(address).unwrap()).unwrap()
    }

    #[test]
    fn test_endpoint_urls_at_root() {
        let client = client("http://192.168.1.20:8080");
        assert_eq!(
            client.endpoint_url(Endpoint::VerticesConfig).unwrap().as_str(),
            "http://192.168.1.20:8080/vertices-config"
        );
    }

    #[test]
    fn test_endpoint_urls_keep_base_path() {
        let client = client("http://host/mirror");
        assert_eq!(client.host_address().as_str(), "http://host/mirror/");
        assert_eq!(
            client.endpoint_url(Endpoint::ColorsUpdate).unwrap().as_str(),
            "http://host/mirror/colors-update"
        );
    }

    #[test]
    fn test_set_host_address() {
        let mut client = client("http://a");
        client.set_host_address(Url::parse("http://b:9000/eit").unwrap());
        assert_eq!(
            client.endpoint_url(Endpoint::ElectrodesConfig).unwrap().as_str(),
            "http://b:9000/eit/electrodes-config"
        );
    }
}
