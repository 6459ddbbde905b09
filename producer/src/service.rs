use crate::capture::{Producer, RelayBody};
use crate::errors::ProducerError;
use crate::metrics_defs::REQUESTS_INFLIGHT;
use hyper::body::Incoming;
use hyper::service::Service;
use hyper::{Request, Response};
use shared::gauge;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub struct ProducerService {
    producer: Arc<Producer>,
}

impl ProducerService {
    pub fn new(producer: Arc<Producer>) -> Self {
        Self { producer }
    }
}

impl Service<Request<Incoming>> for ProducerService {
    type Response = Response<RelayBody>;
    type Error = ProducerError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let producer = self.producer.clone();

        // Dropping this future (client went away) abandons a publish that has not completed yet.
        Box::pin(async move {
            gauge!(REQUESTS_INFLIGHT).increment(1.0);
            let response = producer.handle(req).await;
            gauge!(REQUESTS_INFLIGHT).decrement(1.0);

            Ok(response)
        })
    }
}
