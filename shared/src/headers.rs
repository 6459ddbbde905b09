//! Header hygiene for requests leaving the relay, either forwarded straight
//! through by the producer or replayed by the consumer.

use http::Version;
use http::header::{
    CONNECTION, HeaderMap, HeaderName, HeaderValue, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, TE,
    TRAILER, TRANSFER_ENCODING, UPGRADE, VIA,
};

/// Pseudonym the relay records itself under in `Via`.
const VIA_PSEUDONYM: &str = "relay";

const HOP_BY_HOP: [HeaderName; 8] = [
    CONNECTION,
    HeaderName::from_static("keep-alive"),
    PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION,
    TE,
    TRAILER,
    TRANSFER_ENCODING,
    UPGRADE,
];

pub fn is_http1(version: Version) -> bool {
    matches!(
        version,
        Version::HTTP_09 | Version::HTTP_10 | Version::HTTP_11
    )
}

/// Removes connection-scoped headers of an HTTP/1.x message, including every
/// header named by a `Connection` value. HTTP/2 and later have none.
pub fn strip_hop_by_hop(headers: &mut HeaderMap, version: Version) {
    if !is_http1(version) {
        return;
    }

    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    for name in HOP_BY_HOP.iter().chain(&listed) {
        headers.remove(name);
    }
}

fn protocol_version(version: Version) -> Option<&'static str> {
    match version {
        Version::HTTP_09 => Some("0.9"),
        Version::HTTP_10 => Some("1.0"),
        Version::HTTP_11 => Some("1.1"),
        Version::HTTP_2 => Some("2"),
        Version::HTTP_3 => Some("3"),
        _ => None,
    }
}

/// Records this hop in `Via`, after any hops already listed.
pub fn append_via(headers: &mut HeaderMap, version: Version) {
    let Some(protocol) = protocol_version(version) else {
        tracing::warn!(?version, "Unknown HTTP version, not adding Via");
        return;
    };

    let hop = format!("{protocol} {VIA_PSEUDONYM}");
    let value = match headers.get(VIA).and_then(|v| v.to_str().ok()) {
        Some(previous) => format!("{previous}, {hop}"),
        None => hop,
    };

    if let Ok(value) = HeaderValue::try_from(value) {
        headers.insert(VIA, value);
    }
}
