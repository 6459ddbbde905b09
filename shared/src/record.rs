//! The request record handed from the producer to the consumer through the stream.
//!
//! On the wire a record is a JSON object:
//!
//! ```json
//! {"id": "...", "url": "http://host/path?q", "body": "...", "header": {"name": ["v1", "v2"]}, "method": "POST"}
//! ```
//!
//! The body is carried as a JSON string by raw UTF-8 pass-through. Bodies that
//! are not valid UTF-8 cannot be represented and are rejected when encoding, so
//! every record that encodes successfully also decodes back to an equal record.

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Field a stream entry stores the encoded record under.
pub const RECORD_FIELD: &str = "data";

#[derive(thiserror::Error, Debug)]
pub enum EncodingError {
    #[error("url is not absolute: {0}")]
    RelativeUrl(String),
    #[error("request body is not valid UTF-8")]
    NonUtf8Body,
    #[error("header {0} has a value that is not representable as text")]
    InvalidHeaderValue(HeaderName),
    #[error("could not serialize record: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum DecodingError {
    #[error("malformed record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid method token: {0:?}")]
    InvalidMethod(String),
    #[error("unparsable url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("url is not absolute: {0}")]
    RelativeUrl(String),
    #[error("invalid header name: {0:?}")]
    InvalidHeaderName(String),
    #[error("invalid value for header {0}")]
    InvalidHeaderValue(String),
    #[error("no request record found in payload")]
    MissingRecord,
}

/// Wire shape of a record. Field order matches the published contract.
#[derive(Serialize, Deserialize)]
struct WireRecord {
    id: String,
    url: String,
    body: String,
    header: IndexMap<String, Vec<String>>,
    method: String,
}

/// A captured HTTP request. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestRecord {
    id: String,
    method: Method,
    url: Url,
    header: HeaderMap,
    body: Bytes,
}

impl RequestRecord {
    /// Builds a record for a freshly captured request, assigning it a new
    /// time-ordered id.
    pub fn capture(method: Method, url: Url, header: HeaderMap, body: Bytes) -> Self {
        Self::from_parts(new_record_id(), method, url, header, body)
    }

    pub fn from_parts(
        id: String,
        method: Method,
        url: Url,
        header: HeaderMap,
        body: Bytes,
    ) -> Self {
        RequestRecord {
            id,
            method,
            url,
            header,
            body,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn header(&self) -> &HeaderMap {
        &self.header
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodingError> {
        if !is_absolute(&self.url) {
            return Err(EncodingError::RelativeUrl(self.url.to_string()));
        }

        let body = std::str::from_utf8(&self.body)
            .map_err(|_| EncodingError::NonUtf8Body)?
            .to_owned();

        let mut header: IndexMap<String, Vec<String>> = IndexMap::new();
        for name in self.header.keys() {
            let values = self
                .header
                .get_all(name)
                .iter()
                .map(|v| {
                    v.to_str()
                        .map(str::to_owned)
                        .map_err(|_| EncodingError::InvalidHeaderValue(name.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            header.insert(name.as_str().to_owned(), values);
        }

        let wire = WireRecord {
            id: self.id.clone(),
            url: self.url.to_string(),
            body,
            header,
            method: self.method.as_str().to_owned(),
        };

        Ok(serde_json::to_vec(&wire)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodingError> {
        let wire: WireRecord = serde_json::from_slice(bytes)?;
        Self::try_from(wire)
    }

    /// Decodes a record from an already parsed JSON value.
    pub fn decode_value(value: serde_json::Value) -> Result<Self, DecodingError> {
        let wire: WireRecord = serde_json::from_value(value)?;
        Self::try_from(wire)
    }
}

impl TryFrom<WireRecord> for RequestRecord {
    type Error = DecodingError;

    fn try_from(wire: WireRecord) -> Result<Self, Self::Error> {
        let method = Method::from_bytes(wire.method.as_bytes())
            .map_err(|_| DecodingError::InvalidMethod(wire.method.clone()))?;

        let url = Url::parse(&wire.url).map_err(|source| DecodingError::InvalidUrl {
            url: wire.url.clone(),
            source,
        })?;
        if !is_absolute(&url) {
            return Err(DecodingError::RelativeUrl(wire.url));
        }

        let mut header = HeaderMap::new();
        for (name, values) in wire.header {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| DecodingError::InvalidHeaderName(name.clone()))?;
            for value in values {
                let header_value = HeaderValue::from_str(&value)
                    .map_err(|_| DecodingError::InvalidHeaderValue(name.clone()))?;
                header.append(header_name.clone(), header_value);
            }
        }

        Ok(RequestRecord {
            id: wire.id,
            method,
            url,
            header,
            body: Bytes::from(wire.body),
        })
    }
}

/// Time-ordered, globally unique record id.
pub fn new_record_id() -> String {
    Uuid::now_v7().to_string()
}

// Only http(s) urls with a host can be replayed.
fn is_absolute(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty())
}
