//! Handling of the `Prefer: respond-async` marker (RFC 7240).
//!
//! A request carrying the marker is captured and deferred by the producer. The
//! marker has to be removed again before the request is replayed, otherwise the
//! destination would route the replay straight back into the relay.

use http::header::{HeaderMap, HeaderName, HeaderValue};

pub const PREFER: HeaderName = HeaderName::from_static("prefer");
pub const RESPOND_ASYNC: &str = "respond-async";

// Preference name, without any `=value` or `;param` suffix.
fn preference_name(token: &str) -> &str {
    token
        .split([';', '='])
        .next()
        .unwrap_or(token)
        .trim()
}

fn is_respond_async(token: &str) -> bool {
    preference_name(token).eq_ignore_ascii_case(RESPOND_ASYNC)
}

/// Returns true if any `Prefer` header value contains the `respond-async` preference.
pub fn prefers_async(headers: &HeaderMap) -> bool {
    headers
        .get_all(PREFER)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(is_respond_async)
}

/// Removes the `respond-async` preference from all `Prefer` headers.
///
/// Other preferences are kept. If no preference remains, the header is dropped.
pub fn strip_async_preference(headers: &mut HeaderMap) {
    let remaining: Vec<String> = headers
        .get_all(PREFER)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty() && !is_respond_async(token))
        .map(str::to_owned)
        .collect();

    headers.remove(PREFER);

    if remaining.is_empty() {
        return;
    }

    if let Ok(value) = HeaderValue::from_str(&remaining.join(", ")) {
        headers.insert(PREFER, value);
    }
}
