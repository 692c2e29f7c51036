#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::Multipart,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use teledent::config::{ClientConfig, RelayConfig};
use teledent::relay::{router, RelayState};

/// Serve `app` on an ephemeral loopback port.
pub async fn spawn(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

struct Upload {
    field_name: Option<String>,
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

async fn read_upload(mut multipart: Multipart) -> Upload {
    let field = multipart.next_field().await.unwrap().expect("one multipart field");
    let field_name = field.name().map(str::to_string);
    let file_name = field.file_name().map(str::to_string);
    let content_type = field.content_type().map(str::to_string);
    let bytes = field.bytes().await.unwrap().to_vec();
    Upload {
        field_name,
        file_name,
        content_type,
        bytes,
    }
}

/// Detection endpoint: one cavity, plus an echo of what was received.
async fn fake_detect_json(headers: HeaderMap, multipart: Multipart) -> Json<Value> {
    let upload = read_upload(multipart).await;
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Json(json!({
        "detect_objects_names": "Cavity",
        "detect_objects": [{ "name": "Cavity", "confidence": 0.91 }],
        "received": {
            "field": upload.field_name,
            "filename": upload.file_name,
            "content_type": upload.content_type,
            "bytes": upload.bytes.len(),
            "authorization": auth,
        }
    }))
}

/// Annotation endpoint: returns the uploaded image unchanged.
async fn fake_detect_img(multipart: Multipart) -> impl IntoResponse {
    let upload = read_upload(multipart).await;
    let content_type = upload.content_type.unwrap_or_else(|| "image/jpeg".to_string());
    ([(header::CONTENT_TYPE, content_type)], upload.bytes)
}

/// A healthy inference service.
pub fn fake_space() -> Router {
    Router::new()
        .route("/img_object_detection_to_json", post(fake_detect_json))
        .route("/img_object_detection_to_img", post(fake_detect_img))
}

/// An inference service whose model is failing.
pub fn failing_space() -> Router {
    async fn crashed() -> impl IntoResponse {
        (StatusCode::INTERNAL_SERVER_ERROR, "model crashed")
    }
    Router::new()
        .route("/img_object_detection_to_json", post(crashed))
        .route("/img_object_detection_to_img", post(crashed))
}

/// An inference service that never answers in time.
pub fn slow_space(delay: Duration) -> Router {
    Router::new().route(
        "/img_object_detection_to_json",
        post(move || async move {
            tokio::time::sleep(delay).await;
            Json(json!({ "detect_objects_names": "", "detect_objects": [] }))
        }),
    )
}

/// A service that answers every POST with an HTML page.
pub fn html_space() -> Router {
    Router::new().route(
        "/api/predict-json",
        post(|| async { Html("<html><body><h1>Welcome</h1></body></html>") }),
    )
}

pub fn relay_config(space_url: String) -> RelayConfig {
    RelayConfig {
        space_url,
        ..Default::default()
    }
}

pub fn relay_app(config: RelayConfig) -> Router {
    router(RelayState::new(config).unwrap())
}

/// Start a relay in front of `space` and return its API base URL.
pub async fn spawn_relay_for(space: Router) -> String {
    let space_addr = spawn(space).await;
    let relay_addr = spawn(relay_app(relay_config(format!("http://{}", space_addr)))).await;
    format!("http://{}/api", relay_addr)
}

pub fn client_config(api_base_url: String) -> ClientConfig {
    ClientConfig {
        api_base_url,
        request_timeout_secs: 5,
        health_timeout_secs: 2,
    }
}

/// A relay that streams the annotated image back as raw PNG bytes.
pub fn binary_annotation_relay() -> Router {
    Router::new().route(
        "/api/predict-image",
        post(|| async { ([(header::CONTENT_TYPE, "image/png")], vec![0x89, b'P', b'N', b'G']) }),
    )
}

/// A relay that answers detection requests only after `delay`.
pub fn slow_relay(delay: Duration) -> Router {
    Router::new().route(
        "/api/predict-json",
        post(move || async move {
            tokio::time::sleep(delay).await;
            Json(json!({ "detect_objects_names": "", "detect_objects": [] }))
        }),
    )
}

/// Health endpoint answering 500.
pub fn failing_health_relay() -> Router {
    Router::new().route(
        "/api/health",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "down") }),
    )
}

/// Health endpoint reporting an error state with 200.
pub fn error_state_health_relay() -> Router {
    Router::new().route(
        "/api/health",
        get(|| async { Json(json!({ "healthcheck": "error" })) }),
    )
}

/// Health endpoint serving an HTML page.
pub fn html_health_relay() -> Router {
    Router::new().route(
        "/api/health",
        get(|| async { Html("<html><body>Maintenance</body></html>") }),
    )
}

/// Answers every request with a 500 whose body is cut short, so reading it fails.
pub async fn spawn_truncated_error_server() -> SocketAddr {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_request(&mut socket).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 500 Internal Server Error\r\n\
                          Content-Type: text/plain\r\n\
                          Content-Length: 4096\r\n\
                          Connection: close\r\n\r\n\
                          partial",
                    )
                    .await;
                let _ = socket.shutdown().await;
            });
        }
    });

    async fn read_request(socket: &mut tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let body_len = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    return;
                }
            }
        }
    }

    addr
}
