use async_trait::async_trait;
use bytes::Bytes;
use consumer::Consumer;
use http::header::{CONTENT_TYPE, HOST};
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use producer::Producer;
use producer::broker::{Broker, PublishError};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

#[derive(Default)]
struct MemoryBroker {
    entries: Mutex<Vec<(String, Vec<u8>)>>,
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn publish(&self, stream: &str, payload: &[u8]) -> Result<(), PublishError> {
        self.entries
            .lock()
            .unwrap()
            .push((stream.to_string(), payload.to_vec()));
        Ok(())
    }
}

async fn start_destination() -> (SocketAddr, mpsc::UnboundedReceiver<Request<Bytes>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let tx = tx.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let tx = tx.clone();
                    async move {
                        let (parts, body) = req.into_parts();
                        let body = body.collect().await.unwrap().to_bytes();
                        let _ = tx.send(Request::from_parts(parts, body));
                        Ok::<_, Infallible>(Response::new(Full::new(Bytes::from_static(b"done"))))
                    }
                });
                let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    (addr, rx)
}

fn producer_config() -> producer::config::Config {
    serde_yaml::from_str(
        r#"
listener: {host: 127.0.0.1, port: 8080}
admin_listener: {host: 127.0.0.1, port: 8081}
broker: {url: "redis://127.0.0.1:6379", stream: "requests"}
"#,
    )
    .unwrap()
}

fn consumer_config() -> consumer::config::Config {
    serde_yaml::from_str(
        r#"
listener: {host: 127.0.0.1, port: 9090}
admin_listener: {host: 127.0.0.1, port: 9091}
replay_timeout_secs: 5
"#,
    )
    .unwrap()
}

#[tokio::test]
async fn deferred_request_is_replayed() {
    let (addr, mut received) = start_destination().await;

    let broker = Arc::new(MemoryBroker::default());
    let producer = Producer::new(&producer_config(), broker.clone());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/submit?source=e2e")
        .header(HOST, addr.to_string())
        .header(CONTENT_TYPE, "application/json")
        .header("prefer", "respond-async")
        .body(Full::new(Bytes::from_static(br#"{"body":"x"}"#)))
        .unwrap();

    let response = producer.handle(request).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(body.is_empty());

    // Nothing reaches the destination until the record is consumed
    assert!(received.try_recv().is_err());

    let entries = broker.entries.lock().unwrap().clone();
    assert_eq!(entries.len(), 1);
    let (stream, payload) = &entries[0];
    assert_eq!(stream, "requests");

    // Deliver it the way a stream push source does, as a field/value list
    let delivery = serde_json::to_vec(&serde_json::json!([
        "data",
        String::from_utf8(payload.clone()).unwrap()
    ]))
    .unwrap();

    let consumer = Consumer::new(&consumer_config()).unwrap();
    let status = consumer.replay(&delivery).await.unwrap();
    assert_eq!(status, StatusCode::OK);

    let replayed = received.recv().await.unwrap();
    assert_eq!(replayed.method(), Method::POST);
    assert_eq!(replayed.uri(), "/submit?source=e2e");
    assert_eq!(replayed.body().as_ref(), br#"{"body":"x"}"#);
    assert_eq!(
        replayed.headers().get(CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert!(replayed.headers().get("prefer").is_none());
}

#[tokio::test]
async fn plain_request_is_not_captured() {
    let (addr, mut received) = start_destination().await;

    let broker = Arc::new(MemoryBroker::default());
    let producer = Producer::new(&producer_config(), broker.clone());

    let request = Request::builder()
        .method(Method::GET)
        .uri("/now")
        .header(HOST, addr.to_string())
        .body(Full::new(Bytes::new()))
        .unwrap();

    let response = producer.handle(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.as_ref(), b"done");
    assert!(broker.entries.lock().unwrap().is_empty());

    let forwarded = received.recv().await.unwrap();
    assert_eq!(forwarded.uri(), "/now");
}
