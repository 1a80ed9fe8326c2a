use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::policy::{HttpMethod, WireRequest, WireResponse};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("timeout")]
    Timeout,
    #[error("connect/dns/tls error: {0}")]
    Network(String),
    #[error("response too large (>{max_bytes} bytes)")]
    ResponseTooLarge { max_bytes: usize },
    #[error("transport error: {0}")]
    Other(String),
}

/// The channel a built wire request is sent over.
///
/// Dropping the returned future is how a call is cancelled, so implementations must be
/// cancel-safe.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        req: WireRequest,
        timeout: Duration,
        max_response_bytes: usize,
    ) -> Result<WireResponse, TransportError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        // Backends are addressed directly by ip:port: no redirects, no system proxy.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .user_agent(concat!("relay-exec/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        req: WireRequest,
        timeout: Duration,
        max_response_bytes: usize,
    ) -> Result<WireResponse, TransportError> {
        let url = req.url().map_err(TransportError::Other)?;
        let method = match req.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };
        let mut rb = self.client.request(method, url).timeout(timeout);

        if !req.content_type.is_empty() {
            rb = rb.header(reqwest::header::CONTENT_TYPE, req.content_type);
        }
        for (k, v) in req.headers {
            rb = rb.header(k, v);
        }
        rb = rb.body(req.body);

        let mut resp = rb.send().await.map_err(map_reqwest_error)?;
        let status = resp.status().as_u16();
        if resp
            .content_length()
            .is_some_and(|len| len > max_response_bytes as u64)
        {
            return Err(TransportError::ResponseTooLarge {
                max_bytes: max_response_bytes,
            });
        }

        let mut headers = BTreeMap::new();
        for (k, v) in resp.headers().iter() {
            if let Ok(s) = v.to_str() {
                headers.insert(k.to_string(), s.to_string());
            }
        }
        let content_type = headers.get("content-type").cloned().unwrap_or_default();

        // Chunked replies carry no length; the cap is enforced while reading.
        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(map_reqwest_error)? {
            if body.len() + chunk.len() > max_response_bytes {
                return Err(TransportError::ResponseTooLarge {
                    max_bytes: max_response_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(WireResponse {
            status,
            content_type,
            headers,
            body,
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        return TransportError::Timeout;
    }
    if e.is_connect() || e.is_request() {
        return TransportError::Network(e.to_string());
    }
    TransportError::Other(e.to_string())
}
