//! Docker Engine client over the local Unix socket.
//!
//! Speaks plain HTTP/1 to the engine API using a per-request hyper
//! client connection, the same way the probe path talks to arbitrary
//! endpoints. Only the five endpoints behind [`HostApi`] are used.

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Empty};
use hyper_util::rt::TokioIo;
use serde_json::Value;
use tokio::net::UnixStream;
use tracing::debug;

use crate::api::HostApi;
use crate::error::{HostError, HostResult};

/// Default engine socket path.
pub const DEFAULT_SOCKET: &str = "/var/run/docker.sock";

/// A Docker Engine host reachable over a Unix socket.
#[derive(Debug, Clone)]
pub struct DockerHost {
    socket: String,
}

impl DockerHost {
    pub fn new(socket: impl Into<String>) -> Self {
        Self {
            socket: socket.into(),
        }
    }

    /// Issue one request to the engine and return (status, body).
    async fn request(&self, method: Method, path: &str) -> HostResult<(StatusCode, Bytes)> {
        let stream = UnixStream::connect(&self.socket).await?;
        let io = TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = Request::builder()
            .method(method.clone())
            .uri(path)
            // The engine ignores the host, but HTTP/1.1 requires one.
            .header("host", "docker")
            .header("user-agent", "kontrol/0.1")
            .body(Empty::<Bytes>::new())
            .map_err(|e| HostError::Api {
                status: 0,
                message: e.to_string(),
            })?;

        debug!(%method, %path, "host API request");
        let resp = sender.send_request(req).await?;
        let status = resp.status();
        let body = resp.into_body().collect().await?.to_bytes();
        Ok((status, body))
    }

    /// Map a non-2xx engine response to an error.
    fn check(path: &str, status: StatusCode, body: &Bytes) -> HostResult<()> {
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::NOT_FOUND {
            return Err(HostError::NotFound(path.to_string()));
        }
        let message = engine_message(body);
        Err(HostError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Extract the engine's `{"message": ...}` error body, falling back to
/// the raw text.
fn engine_message(body: &Bytes) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) {
        if let Some(Value::String(msg)) = map.get("message") {
            return msg.clone();
        }
    }
    String::from_utf8_lossy(body).into_owned()
}

#[async_trait]
impl HostApi for DockerHost {
    async fn list_containers(&self) -> HostResult<Vec<Value>> {
        let path = "/containers/json?all=true";
        let (status, body) = self.request(Method::GET, path).await?;
        Self::check(path, status, &body)?;
        let containers: Vec<Value> = serde_json::from_slice(&body)?;
        Ok(containers)
    }

    async fn get_container(&self, id: &str) -> HostResult<Value> {
        let path = format!("/containers/{id}/json");
        let (status, body) = self.request(Method::GET, &path).await?;
        Self::check(&path, status, &body)?;
        let container: Value = serde_json::from_slice(&body)?;
        Ok(container)
    }

    async fn stop(&self, id: &str) -> HostResult<()> {
        let path = format!("/containers/{id}/stop");
        let (status, body) = self.request(Method::POST, &path).await?;
        // 304: already stopped. The pipeline treats that as success.
        if status == StatusCode::NOT_MODIFIED {
            return Ok(());
        }
        Self::check(&path, status, &body)
    }

    async fn restart(&self, id: &str) -> HostResult<()> {
        let path = format!("/containers/{id}/restart");
        let (status, body) = self.request(Method::POST, &path).await?;
        Self::check(&path, status, &body)
    }

    async fn remove(&self, id: &str) -> HostResult<()> {
        let path = format!("/containers/{id}");
        let (status, body) = self.request(Method::DELETE, &path).await?;
        Self::check(&path, status, &body)
    }
}
