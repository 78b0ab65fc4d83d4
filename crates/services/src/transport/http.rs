use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::{ApiRequest, ApiResponse, Transport};
use crate::config::ClientConfig;
use crate::error::TransportError;

/// `reqwest`-backed transport.
///
/// The cookie store is enabled so the server's refresh credential cookie is
/// replayed on `auth/refresh-token`, the way a browser sends credentials.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Returns `TransportError::Other` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.as_str().trim_end_matches('/').to_owned(),
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(
        skip_all,
        fields(request_id = %request.id(), method = %request.method(), path = request.path(), attempt = request.attempt())
    )]
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method().clone(), self.url_for(request.path()));

        if !request.query().is_empty() {
            builder = builder.query(request.query());
        }
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(%status, "response received");

        Ok(ApiResponse::new(status, body))
    }
}
