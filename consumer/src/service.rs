use crate::errors::{ConsumerError, Result};
use crate::metrics_defs::REQUESTS_INFLIGHT;
use crate::replay::Consumer;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use shared::gauge;
use shared::http::{make_boxed_error_response, make_empty_response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

const CE_ID: &str = "ce-id";

/// Receives pushed stream entries and replays the record each one carries.
///
/// The response status tells the delivery mechanism whether to retry: 200 once
/// the destination answered, anything else otherwise.
pub struct ConsumerService {
    consumer: Arc<Consumer>,
    max_event_size: usize,
}

impl ConsumerService {
    pub fn new(consumer: Arc<Consumer>, max_event_size: usize) -> Self {
        Self {
            consumer,
            max_event_size,
        }
    }
}

impl<B> Service<Request<B>> for ConsumerService
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    type Response = Response<BoxBody<Bytes, ConsumerError>>;
    type Error = ConsumerError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let consumer = self.consumer.clone();
        let max_event_size = self.max_event_size;

        Box::pin(async move {
            if req.method() != Method::POST {
                return Ok(make_boxed_error_response(StatusCode::METHOD_NOT_ALLOWED));
            }

            gauge!(REQUESTS_INFLIGHT).increment(1.0);
            let result = deliver(&consumer, req, max_event_size).await;
            gauge!(REQUESTS_INFLIGHT).decrement(1.0);

            match result {
                Ok(_) => Ok(make_empty_response(StatusCode::OK)),
                Err(e) => Ok(make_boxed_error_response(e.status_code())),
            }
        })
    }
}

async fn deliver<B>(
    consumer: &Consumer,
    req: Request<B>,
    max_event_size: usize,
) -> Result<StatusCode>
where
    B: Body<Data = Bytes>,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let (parts, body) = req.into_parts();
    let event_id = parts
        .headers
        .get(CE_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    let payload = match Limited::new(body, max_event_size).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            tracing::warn!(event_id, limit = max_event_size, "Delivered payload too large");
            return Err(ConsumerError::PayloadTooLarge {
                limit: max_event_size,
            });
        }
        Err(e) => {
            tracing::warn!(event_id, error = %e, "Failed to read delivered payload");
            return Err(ConsumerError::RequestBodyError(e.to_string()));
        }
    };

    tracing::debug!(event_id, size = payload.len(), "Received delivery");
    consumer.replay(&payload).await
}
