use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// Outgoing call as shaped by a request policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WireRequest {
    pub method: HttpMethod,
    /// `ip:port` the channel is initialized for.
    pub endpoint: Option<String>,
    pub uri: String,
    pub query: Vec<(String, String)>,
    /// Empty when no `Content-Type` was set.
    pub content_type: String,
    pub headers: BTreeMap<String, String>,
    #[serde(serialize_with = "serialize_body")]
    pub body: Vec<u8>,
}

impl WireRequest {
    /// Set a query parameter, replacing an earlier value for the same key.
    pub fn set_query(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.query.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.query.push((key, value)),
        }
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// URI with the query parameters appended, percent-encoded.
    pub fn uri_with_query(&self) -> String {
        if self.query.is_empty() {
            return self.uri.clone();
        }
        let encoded: Vec<String> = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        let sep = if self.uri.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.uri, sep, encoded.join("&"))
    }

    pub fn url(&self) -> Result<url::Url, String> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| "request has no endpoint".to_string())?;
        let target = self.uri_with_query();
        let path = if target.starts_with('/') {
            target
        } else {
            format!("/{target}")
        };
        url::Url::parse(&format!("http://{endpoint}{path}")).map_err(|e| e.to_string())
    }
}

#[allow(clippy::ptr_arg)]
fn serialize_body<S: serde::Serializer>(body: &Vec<u8>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&String::from_utf8_lossy(body))
}

/// Reply as delivered by the transport.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireResponse {
    pub status: u16,
    pub content_type: String,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl WireResponse {
    pub fn new(status: u16, content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: content_type.into(),
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// 2xx. Any other status fails the call before the response block runs.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
