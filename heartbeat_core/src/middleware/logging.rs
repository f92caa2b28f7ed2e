//! Request logging middleware configuration

use axum::{body::Body, Router};
use http::{Request, Response};
use std::time::Duration;
use tower_http::{classify::ServerErrorsFailureClass, trace::TraceLayer};
use tracing::{info_span, Span};
use uuid::Uuid;

use crate::telemetry::{duration_ms, ServiceResource};

/// Wraps every route in an `http_request` span tagged with the service identity.
pub fn with_request_logging<S>(router: Router<S>, resource: ServiceResource) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let layer = TraceLayer::new_for_http()
        .make_span_with(move |request: &Request<Body>| {
            info_span!(
                "http_request",
                request_id = %Uuid::new_v4(),
                method = %request.method(),
                path = %request.uri().path(),
                query = ?request.uri().query(),
                service.name = %resource.service_name,
                service.version = %resource.service_version,
                deployment.environment = %resource.environment,
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::debug!(
                "started processing request {} {}",
                request.method(),
                request.uri().path()
            );
        })
        .on_response(|response: &Response<Body>, latency: Duration, _span: &Span| {
            let status = response.status();
            let latency_ms = duration_ms(latency);

            if status.is_server_error() {
                tracing::error!(status = status.as_u16(), latency_ms, "server error response");
            } else if status.is_client_error() {
                tracing::warn!(status = status.as_u16(), latency_ms, "client error response");
            } else {
                tracing::info!(status = status.as_u16(), latency_ms, "request completed");
            }
        })
        .on_failure(
            |error: ServerErrorsFailureClass, latency: Duration, _span: &Span| {
                tracing::error!(
                    latency_ms = duration_ms(latency),
                    error = %error,
                    "request failed"
                );
            },
        );

    router.layer(layer)
}
