//! Default transport backed by `reqwest`.

use async_trait::async_trait;
use bytes::Bytes;

use super::{BodySource, HttpTransport, WireResponse};
use crate::codec::WireRequest;
use crate::error::{BodyError, TransportError};

/// Executes requests with a shared `reqwest::Client`.
///
/// Connection pooling and TLS are left to the client. Timeouts are enforced by
/// the execution stack, not by the client.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: WireRequest) -> Result<WireResponse, TransportError> {
        let request = reqwest::Request::try_from(request)
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        Ok(WireResponse::new(status, headers, Box::new(ReqwestBody(response))))
    }
}

/// Streams the entity of a `reqwest::Response` chunk by chunk.
struct ReqwestBody(reqwest::Response);

#[async_trait]
impl BodySource for ReqwestBody {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, BodyError> {
        self.0
            .chunk()
            .await
            .map_err(|e| BodyError::Read(e.to_string()))
    }
}
