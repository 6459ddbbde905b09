use crate::http::make_boxed_error_response;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

/// Serves `/health` and `/ready` on the admin listener of each relay service.
pub struct AdminService<F, E> {
    is_ready: F,
    _error: PhantomData<fn() -> E>,
}

impl<F, E> AdminService<F, E>
where
    F: Fn() -> bool,
{
    pub fn new(is_ready: F) -> Self {
        Self {
            is_ready,
            _error: PhantomData,
        }
    }
}

impl<F, E, B> Service<Request<B>> for AdminService<F, E>
where
    F: Fn() -> bool,
    E: Send + 'static,
{
    type Response = Response<BoxBody<Bytes, E>>;
    type Error = E;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let response = respond(req.uri().path(), &self.is_ready);
        Box::pin(async move { Ok(response) })
    }
}

fn respond<E: 'static>(path: &str, is_ready: impl Fn() -> bool) -> Response<BoxBody<Bytes, E>> {
    match path {
        "/health" => ok(),
        "/ready" if is_ready() => ok(),
        "/ready" => make_boxed_error_response(StatusCode::SERVICE_UNAVAILABLE),
        _ => make_boxed_error_response(StatusCode::NOT_FOUND),
    }
}

fn ok<E: 'static>() -> Response<BoxBody<Bytes, E>> {
    Response::new(
        Full::new(Bytes::from_static(b"ok\n"))
            .map_err(|e| match e {})
            .boxed(),
    )
}
