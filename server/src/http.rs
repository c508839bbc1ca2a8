use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use component::Logger;
use tracing::instrument::WithSubscriber;

pub type Result<T, E = AppError> = core::result::Result<T, E>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub err: anyhow::Error,
}

impl AppError {
    pub fn bad_request(message: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            err: anyhow::anyhow!("{message}"),
        }
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            err: err.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.err.to_string()).into_response();
        response.extensions_mut().insert(Arc::new(self));
        response
    }
}

// log response middleware
//
// request is served and logged under the service's logger
pub async fn log_middleware(
    State(logger): State<Logger>,
    method: Method,
    uri: Uri,
    request: Request<Body>,
    next: Next,
) -> Response {
    let timestamp = Utc::now();
    let response = next.run(request).with_subscriber(logger.clone()).await;
    let request_time_ms = Utc::now()
        .signed_duration_since(timestamp)
        .num_milliseconds();

    tracing::dispatcher::with_default(&logger, || {
        match response.extensions().get::<Arc<AppError>>() {
            Some(error) => tracing::error!(
                request_time_ms = request_time_ms,
                method = method.as_str(),
                status_code = response.status().as_u16(),
                path = uri.path(),
                error = %error.err
            ),
            None => tracing::info!(
                request_time_ms = request_time_ms,
                method = method.as_str(),
                status_code = response.status().as_u16(),
                path = uri.path(),
            ),
        }
    });
    response
}

pub async fn health() -> &'static str {
    "ok"
}
