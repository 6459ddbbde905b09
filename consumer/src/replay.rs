use crate::config::Config;
use crate::envelope::extract_record;
use crate::errors::{ConsumerError, Result};
use crate::metrics_defs::{REPLAY_DURATION, REPLAYS};
use bytes::Bytes;
use http::Version;
use hyper::header::{CONTENT_LENGTH, HOST};
use hyper::{Request, StatusCode};
use shared::headers::strip_hop_by_hop;
use shared::prefer::strip_async_preference;
use shared::record::RequestRecord;
use shared::{counter, histogram};
use std::time::{Duration, Instant};

/// Replays captured requests against their original destination.
///
/// Each call is a single, independent attempt. Delivery upstream is
/// at-least-once, so the same record can be replayed more than once.
#[derive(Clone)]
pub struct Consumer {
    client: reqwest::Client,
}

impl Consumer {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.replay_timeout_secs))
            .build()?;

        Ok(Self { client })
    }

    /// Locates the record in a delivered payload and replays it.
    /// Returns the status the destination answered with.
    pub async fn replay(&self, payload: &[u8]) -> Result<StatusCode> {
        let record = extract_record(payload).inspect_err(|e| {
            counter!(REPLAYS, "outcome" => "decoding_error").increment(1);
            tracing::error!(error = %e, "Failed to decode delivered record");
        })?;

        self.replay_record(&record).await
    }

    pub async fn replay_record(&self, record: &RequestRecord) -> Result<StatusCode> {
        let request = reconstruct(record)?;
        let request =
            reqwest::Request::try_from(request).map_err(|e| ConsumerError::InvalidRequest {
                id: record.id().to_owned(),
                reason: e.to_string(),
            })?;

        let start = Instant::now();
        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(source) => {
                counter!(REPLAYS, "outcome" => "replay_error").increment(1);
                tracing::error!(
                    id = record.id(),
                    url = %record.url(),
                    error = %source,
                    "Replay failed"
                );
                return Err(ConsumerError::Replay {
                    id: record.id().to_owned(),
                    url: record.url().to_string(),
                    source,
                });
            }
        };

        let status = response.status();

        // Nobody is waiting for the response, drain and discard it.
        if let Err(e) = response.bytes().await {
            tracing::debug!(id = record.id(), error = %e, "Failed to drain response body");
        }
        histogram!(REPLAY_DURATION).record(start.elapsed().as_secs_f64());

        if status.is_success() {
            counter!(REPLAYS, "outcome" => "success").increment(1);
            tracing::debug!(id = record.id(), url = %record.url(), %status, "Replayed request");
        } else {
            counter!(REPLAYS, "outcome" => "error_status").increment(1);
            tracing::warn!(
                id = record.id(),
                url = %record.url(),
                %status,
                "Destination answered replay with an error status"
            );
        }

        Ok(status)
    }
}

/// Rebuilds the outbound request for a record.
///
/// The async preference is always removed so the destination handles the
/// replay synchronously instead of deferring it again. Hop-by-hop headers,
/// Host and Content-Length are dropped; the client derives them from the url
/// and the body.
pub fn reconstruct(record: &RequestRecord) -> Result<Request<Bytes>> {
    let mut headers = record.header().clone();
    strip_hop_by_hop(&mut headers, Version::HTTP_11);
    headers.remove(HOST);
    headers.remove(CONTENT_LENGTH);
    strip_async_preference(&mut headers);

    let mut request = Request::builder()
        .method(record.method().clone())
        .uri(record.url().as_str())
        .body(record.body().clone())
        .map_err(|e| ConsumerError::InvalidRequest {
            id: record.id().to_owned(),
            reason: e.to_string(),
        })?;
    *request.headers_mut() = headers;

    Ok(request)
}
