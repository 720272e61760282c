//! Outbound GET client shared by the forward paths and the health monitor.
//!
//! # Responsibilities
//! - Issue a GET to an absolute backend URL
//! - Bound each call with a timeout
//! - Buffer the full response body up to a cap (no streaming relay)
//! - Map every transport-level failure to `BackendUnreachable`

use std::future::poll_fn;
use std::pin::Pin;
use std::time::Duration;

use axum::body::{Body, Bytes, HttpBody};
use axum::http::{Method, Request, Response, StatusCode, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time;

use crate::load_balancer::{LoadBalancerError, LoadBalancerResult};

/// A fully-read backend response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Pooled HTTP/1.1 client with a per-call deadline.
#[derive(Clone)]
pub struct Upstream {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
    max_body_bytes: usize,
}

fn unreachable(url: &str, reason: String) -> LoadBalancerError {
    LoadBalancerError::BackendUnreachable {
        url: url.to_string(),
        reason,
    }
}

impl Upstream {
    pub fn new(timeout: Duration, max_body_bytes: usize) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            timeout,
            max_body_bytes,
        }
    }

    /// GET `url` and read the whole body.
    pub async fn get(&self, url: &str) -> LoadBalancerResult<UpstreamResponse> {
        let exchange = async {
            let response = self.send(url).await?;
            let status = response.status();
            let body = self.read_body(url, response.into_body()).await?;
            Ok::<_, LoadBalancerError>(UpstreamResponse { status, body })
        };

        match time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(unreachable(url, format!("timed out after {:?}", self.timeout))),
        }
    }

    /// GET `url` and return only the status. The body is never buffered.
    pub async fn status(&self, url: &str) -> LoadBalancerResult<StatusCode> {
        match time::timeout(self.timeout, self.send(url)).await {
            Ok(result) => result.map(|response| response.status()),
            Err(_) => Err(unreachable(url, format!("timed out after {:?}", self.timeout))),
        }
    }

    async fn send(&self, url: &str) -> LoadBalancerResult<Response<Body>> {
        let uri: Uri = url
            .parse()
            .map_err(|e| unreachable(url, format!("invalid uri: {}", e)))?;
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header("user-agent", "sticky-balancer")
            .body(Body::empty())
            .map_err(|e| unreachable(url, e.to_string()))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| unreachable(url, e.to_string()))?;
        Ok(response.map(Body::new))
    }

    /// Collect data frames until the body ends or exceeds `max_body_bytes`.
    async fn read_body(&self, url: &str, mut body: Body) -> LoadBalancerResult<Bytes> {
        let mut buf = Vec::new();
        while let Some(frame) = poll_fn(|cx| Pin::new(&mut body).poll_frame(cx)).await {
            let frame = frame.map_err(|e| unreachable(url, format!("reading body: {}", e)))?;
            let Ok(data) = frame.into_data() else {
                continue;
            };
            if buf.len() + data.len() > self.max_body_bytes {
                return Err(LoadBalancerError::ResponseTooLarge {
                    url: url.to_string(),
                    limit: self.max_body_bytes,
                });
            }
            buf.extend_from_slice(&data);
        }
        Ok(Bytes::from(buf))
    }
}
