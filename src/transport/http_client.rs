//! Reqwest-backed transport.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{HttpTransport, TransportRequest, TransportResponse};
use crate::error::FetchResult;

/// Production transport over a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport with a fresh connection pool
    pub fn new() -> FetchResult<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }

    /// Reuse an existing client (and its pool, proxies, TLS settings)
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> FetchResult<TransportResponse> {
        let mut builder = self
            .client
            .request(request.method.into(), request.url.as_str());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        debug!(
            method = %request.method,
            url = %request.url,
            status = status.as_u16(),
            body_bytes = body.len(),
            "HTTP exchange completed"
        );

        Ok(TransportResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}
