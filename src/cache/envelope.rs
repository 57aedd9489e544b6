//! Cached Response Envelope Module
//!
//! The unit stored in the cache: status, headers and body of one upstream
//! response, serialized as JSON with base64 header values and body.

use std::collections::BTreeMap;

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{ProxyError, Result};
use crate::proxy::UpstreamResponse;

// == Cached Response ==
/// A captured upstream response.
///
/// Header names map to their raw values in arrival order, so repeated
/// headers such as `set-cookie` and non-UTF-8 values replay byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// Header name to ordered values
    #[serde(with = "base64_headers")]
    pub headers: BTreeMap<String, Vec<Vec<u8>>>,
    /// Raw response body
    #[serde(with = "base64_body")]
    pub body: Vec<u8>,
    /// HTTP status code
    pub status_code: u16,
}

impl CachedResponse {
    /// Creates an envelope from its parts.
    pub fn new(status_code: u16, headers: BTreeMap<String, Vec<Vec<u8>>>, body: Vec<u8>) -> Self {
        Self {
            headers,
            body,
            status_code,
        }
    }

    /// Captures a live upstream response.
    pub fn from_upstream(response: &UpstreamResponse) -> Self {
        let mut headers: BTreeMap<String, Vec<Vec<u8>>> = BTreeMap::new();
        for (name, value) in response.headers.iter() {
            headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(value.as_bytes().to_vec());
        }

        Self {
            headers,
            body: response.body.to_vec(),
            status_code: response.status.as_u16(),
        }
    }

    // == Encode ==
    /// Serializes the envelope into the cache value format.
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    // == Decode ==
    /// Parses a cache value back into an envelope.
    ///
    /// Anything that could not be replayed as an HTTP response is rejected,
    /// so a successful decode is always safe to serve.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let envelope: CachedResponse =
            serde_json::from_slice(bytes).map_err(|e| ProxyError::Decode(e.to_string()))?;
        envelope.status()?;
        envelope.header_map()?;
        Ok(envelope)
    }

    /// Converts the envelope into a response ready to relay.
    pub fn into_upstream(self) -> Result<UpstreamResponse> {
        let status = self.status()?;
        let headers = self.header_map()?;
        Ok(UpstreamResponse {
            status,
            headers,
            body: Bytes::from(self.body),
        })
    }

    fn status(&self) -> Result<StatusCode> {
        StatusCode::from_u16(self.status_code)
            .map_err(|_| ProxyError::Decode(format!("invalid status code {}", self.status_code)))
    }

    fn header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, values) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ProxyError::Decode(format!("invalid header name '{}'", name)))?;
            for value in values {
                let value = HeaderValue::from_bytes(value).map_err(|_| {
                    ProxyError::Decode(format!("invalid value for header '{}'", name))
                })?;
                map.append(name.clone(), value);
            }
        }
        Ok(map)
    }
}

mod base64_headers {
    use std::collections::BTreeMap;

    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        headers: &BTreeMap<String, Vec<Vec<u8>>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(headers.len()))?;
        for (name, values) in headers {
            let encoded: Vec<String> = values.iter().map(|v| STANDARD.encode(v)).collect();
            map.serialize_entry(name, &encoded)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Vec<Vec<u8>>>, D::Error> {
        let encoded = BTreeMap::<String, Vec<String>>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|(name, values)| {
                let values = values
                    .into_iter()
                    .map(|v| STANDARD.decode(v))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(serde::de::Error::custom)?;
                Ok((name, values))
            })
            .collect()
    }
}

mod base64_body {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
