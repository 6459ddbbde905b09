use crate::broker::{Broker, PublishError};
use crate::config::{BrokerConfig, Config, Scheme};
use async_trait::async_trait;
use http_body_util::channel::Channel;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use shared::config::Listener;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::{Notify, mpsc};

/// In-memory broker recording every published entry.
#[derive(Default)]
pub struct FakeBroker {
    published: Mutex<Vec<(String, Vec<u8>)>>,
    fail: AtomicBool,
}

impl FakeBroker {
    pub fn failing() -> Self {
        FakeBroker {
            published: Mutex::default(),
            fail: AtomicBool::new(true),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Broker for FakeBroker {
    async fn publish(&self, stream: &str, payload: &[u8]) -> Result<(), PublishError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(PublishError::Rejected("simulated failure".into()));
        }
        self.published
            .lock()
            .unwrap()
            .push((stream.to_string(), payload.to_vec()));
        Ok(())
    }

    async fn ping(&self) -> Result<(), PublishError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(PublishError::Rejected("simulated outage".into()));
        }
        Ok(())
    }
}

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
        broker: BrokerConfig {
            url: "redis://127.0.0.1:6379".parse().unwrap(),
            stream: "mystream".into(),
        },
        request_size_limit: 25,
        scheme: Scheme::Http,
        passthrough_timeout_secs: 5,
    }
}

async fn echo_handler(
    req: Request<Incoming>,
    tx: mpsc::UnboundedSender<Request<Bytes>>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body_bytes = body
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .unwrap_or_else(|_| Bytes::new());

    let _ = tx.send(Request::from_parts(parts, body_bytes.clone()));
    Ok(Response::new(Full::new(body_bytes)))
}

/// Starts a server echoing request bodies back. Every request it receives is
/// also sent to the returned channel.
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
                let service = service_fn(move |req| echo_handler(req, tx.clone()));
                let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                    .serve_connection(io, service)
                    .await;
            });
        }
    });

    (addr, rx)
}

/// Starts a server answering every request with a chunked body: `first,` is
/// sent right away, `second` only once `release` is notified.
pub async fn start_chunked_server(release: Arc<Notify>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let service = service_fn(move |_req: Request<Incoming>| {
            let release = release.clone();
            async move {
                let (mut tx, body) = Channel::<Bytes, Infallible>::new(1);
                tokio::spawn(async move {
                    let _ = tx.send_data(Bytes::from_static(b"first,")).await;
                    release.notified().await;
                    let _ = tx.send_data(Bytes::from_static(b"second")).await;
                });
                Ok::<_, Infallible>(Response::new(body))
            }
        });
        let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
            .serve_connection(TokioIo::new(stream), service)
            .await;
    });

    addr
}
