use crate::broker::Broker;
use crate::config::{Config, Scheme};
use crate::errors::{ProducerError, Result};
use crate::metrics_defs::{
    PUBLISH_DURATION, REQUEST_BODY_SIZE, REQUESTS_CAPTURED, REQUESTS_PASSTHROUGH, REQUESTS_REJECTED,
};
use http::request::Parts;
use http::uri::Authority;
use http::{Uri, Version};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::HOST;
use hyper::{Request, Response, StatusCode};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use shared::headers::{append_via, strip_hop_by_hop};
use shared::prefer::prefers_async;
use shared::record::RequestRecord;
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use url::Url;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Streaming body used in both directions of a pass-through, and for the
/// responses the producer answers with itself.
pub type RelayBody = UnsyncBoxBody<Bytes, BoxError>;

/// Captures requests that prefer asynchronous handling and publishes them to
/// the stream. Everything else is forwarded to its destination as is.
pub struct Producer {
    broker: Arc<dyn Broker>,
    stream: String,
    request_size_limit: usize,
    scheme: Scheme,
    passthrough_timeout: Duration,
    client: Client<HttpConnector, RelayBody>,
}

impl Producer {
    pub fn new(config: &Config, broker: Arc<dyn Broker>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            broker,
            stream: config.broker.stream.clone(),
            request_size_limit: config.request_size_limit,
            scheme: config.scheme,
            passthrough_timeout: Duration::from_secs(config.passthrough_timeout_secs),
            client,
        }
    }

    /// Handles one inbound request.
    ///
    /// Requests carrying `Prefer: respond-async` are acknowledged with 202 once
    /// published. Any capture failure results in a 500 and nothing is published.
    pub async fn handle<B>(&self, request: Request<B>) -> Response<RelayBody>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let method = request.method().clone();
        let path = request.uri().path().to_owned();

        let result = if prefers_async(request.headers()) {
            self.enqueue(request).await.map(|id| {
                tracing::debug!(%method, %path, id = %id, "Request captured");
                counter!(REQUESTS_CAPTURED).increment(1);
                empty_response(StatusCode::ACCEPTED)
            })
        } else {
            counter!(REQUESTS_PASSTHROUGH).increment(1);
            self.forward(request).await
        };

        result.unwrap_or_else(|e| {
            match &e {
                ProducerError::PayloadTooLarge { .. } => {
                    tracing::warn!(%method, %path, error = %e, "Rejected request")
                }
                _ => tracing::error!(%method, %path, error = %e, "Failed to handle request"),
            }
            counter!(REQUESTS_REJECTED, "reason" => e.reason()).increment(1);

            let status = e.status_code();
            let reason = status.canonical_reason().unwrap_or("");
            let mut response = Response::new(full_body(Bytes::from_static(reason.as_bytes())));
            *response.status_mut() = status;
            response
        })
    }

    /// Captures the request into a record and appends it to the stream.
    /// Returns the id of the published record.
    pub async fn enqueue<B>(&self, request: Request<B>) -> Result<String>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = request.into_parts();

        let body = read_limited(body, self.request_size_limit).await?;
        histogram!(REQUEST_BODY_SIZE).record(body.len() as f64);

        let url = target_url(self.scheme, &parts)?;
        let record = RequestRecord::capture(parts.method, url, parts.headers, body);
        let payload = record.encode()?;

        let start = Instant::now();
        let published = self.broker.publish(&self.stream, &payload).await;
        histogram!(PUBLISH_DURATION).record(start.elapsed().as_secs_f64());
        published?;

        Ok(record.id().to_owned())
    }

    /// Sends the request synchronously to its destination. The response body
    /// is streamed back as it arrives; only the wait for the response head is
    /// bounded by the pass-through timeout.
    async fn forward<B>(&self, request: Request<B>) -> Result<Response<RelayBody>>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (mut parts, body) = request.into_parts();
        let url = target_url(self.scheme, &parts)?;
        let upstream_identifier = url.host_str().unwrap_or(url.as_str()).to_owned();

        let request_version = parts.version;
        strip_hop_by_hop(&mut parts.headers, request_version);
        append_via(&mut parts.headers, request_version);

        parts.uri = url
            .as_str()
            .parse::<Uri>()
            .map_err(|e| ProducerError::InvalidTarget(e.to_string()))?;
        // The pooled client speaks HTTP/1.1 to destinations.
        parts.version = Version::HTTP_11;

        let body: RelayBody = body.map_err(Into::into).boxed_unsync();
        let upstream_request = Request::from_parts(parts, body);

        let response = timeout(
            self.passthrough_timeout,
            self.client.request(upstream_request),
        )
        .await
        .map_err(|_| ProducerError::UpstreamTimeout(upstream_identifier.clone()))?
        .map_err(|e| ProducerError::UpstreamRequestFailed(upstream_identifier, e.to_string()))?;

        let (mut parts, body) = response.into_parts();
        let response_version = parts.version;
        strip_hop_by_hop(&mut parts.headers, response_version);
        append_via(&mut parts.headers, response_version);

        Ok(Response::from_parts(
            parts,
            body.map_err(Into::into).boxed_unsync(),
        ))
    }
}

/// Reads the full body, failing as soon as more than `limit` bytes arrive.
async fn read_limited<B>(body: B, limit: usize) -> Result<Bytes>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(ProducerError::PayloadTooLarge { limit })
        }
        Err(e) => Err(ProducerError::RequestBodyError(e.to_string())),
    }
}

/// Rebuilds the absolute url of an inbound request. The request line only
/// carries the path, so the host comes from the Host header, falling back to
/// the authority of the request uri (HTTP/2).
///
/// The host must be a plain `host[:port]` authority. The path goes through
/// WHATWG url parsing, so dot segments are resolved and characters outside the
/// url code points are percent-encoded.
fn target_url(scheme: Scheme, parts: &Parts) -> Result<Url> {
    let authority = match parts.headers.get(HOST).filter(|h| !h.is_empty()) {
        Some(host) => Authority::try_from(host.as_bytes())
            .map_err(|e| ProducerError::InvalidTarget(format!("invalid Host header: {e}")))?,
        None => parts
            .uri
            .authority()
            .cloned()
            .ok_or(ProducerError::MissingHost)?,
    };
    if authority.as_str().contains('@') {
        return Err(ProducerError::InvalidTarget(format!(
            "host carries user info: {authority}"
        )));
    }

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let url = Url::parse(&format!("{}://{authority}{path_and_query}", scheme.as_str()))
        .map_err(|e| ProducerError::InvalidTarget(e.to_string()))?;

    if url.host_str().is_none_or(str::is_empty) {
        return Err(ProducerError::MissingHost);
    }

    Ok(url)
}

fn full_body(bytes: Bytes) -> RelayBody {
    Full::new(bytes).map_err(|e| match e {}).boxed_unsync()
}

fn empty_response(status: StatusCode) -> Response<RelayBody> {
    let mut response = Response::new(Empty::new().map_err(|e| match e {}).boxed_unsync());
    *response.status_mut() = status;
    response
}
