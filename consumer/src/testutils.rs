use crate::config::Config;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use shared::config::Listener;
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

pub fn test_config() -> Config {
    Config {
        listener: Listener {
            host: "127.0.0.1".into(),
            port: 8080,
        },
        admin_listener: Listener {
            host: "127.0.0.1".into(),
            port: 8081,
        },
        replay_timeout_secs: 5,
        max_event_size: 1024,
    }
}

// Echoes the request body. `/status/<code>` answers with that status instead.
async fn destination_handler(
    req: Request<Incoming>,
    tx: mpsc::UnboundedSender<Request<Bytes>>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body_bytes = body
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .unwrap_or_else(|_| Bytes::new());

    let status = parts
        .uri
        .path()
        .strip_prefix("/status/")
        .and_then(|code| code.parse::<u16>().ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK);

    let _ = tx.send(Request::from_parts(parts, body_bytes.clone()));

    let mut response = Response::new(Full::new(body_bytes));
    *response.status_mut() = status;
    Ok(response)
}

/// Starts a destination server. Every request it receives is sent to the
/// returned channel.
pub async fn start_test_server() -> (SocketAddr, mpsc::UnboundedReceiver<Request<Bytes>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let io = TokioIo::new(stream);
            let tx = tx.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| destination_handler(req, tx.clone()));
                let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                    .serve_connection(io, service)
                    .await;
            });
        }
    });

    (addr, rx)
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
