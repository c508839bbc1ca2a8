//! Prometheus request metrics
//!
//! Every request is counted and timed by status code, method and matched route.
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

pub const NAMESPACE: &str = "analytics";

/// Path label of requests no route matched
const UNMATCHED: &str = "unmatched";

const LABELS: [&str; 3] = ["status_code", "method", "path"];

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    requests: IntCounterVec,
    latency: HistogramVec,
}

impl Metrics {
    pub fn new(namespace: &str) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let requests = IntCounterVec::new(
            Opts::new("requests_total", "Count of all HTTP requests").namespace(namespace),
            &LABELS,
        )?;
        let latency = HistogramVec::new(
            HistogramOpts::new("request_duration_seconds", "Duration of all HTTP requests")
                .namespace(namespace),
            &LABELS,
        )?;
        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(latency.clone()))?;
        Ok(Self {
            registry,
            requests,
            latency,
        })
    }

    pub fn observe(&self, status_code: u16, method: &str, path: &str, elapsed: Duration) {
        let status_code = status_code.to_string();
        let labels = [status_code.as_str(), method, path];
        self.requests.with_label_values(&labels).inc();
        self.latency
            .with_label_values(&labels)
            .observe(elapsed.as_secs_f64());
    }

    /// Text exposition format
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = vec![];
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

pub async fn track(
    State(metrics): State<Metrics>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED.into());
    let started = Instant::now();
    let response = next.run(request).await;
    metrics.observe(
        response.status().as_u16(),
        method.as_str(),
        &path,
        started.elapsed(),
    );
    response
}

pub async fn render(State(metrics): State<Metrics>) -> crate::http::Result<String> {
    Ok(metrics.render()?)
}
