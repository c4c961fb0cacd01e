use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use tracing::{debug, warn};

use crate::error::{BoxError, Error};
use crate::server::AppState;
use crate::strategy::Strategy;

/// Response type produced by every route.
pub type HttpResponse = Response<Full<Bytes>>;

/// Route one HTTP request.
///
/// - POST on a strategy route drains the body with that strategy
/// - GET /metrics - Prometheus format metrics
/// - GET /health - Health check endpoint
pub async fn handle<B>(state: Arc<AppState>, req: Request<B>) -> Result<HttpResponse, Infallible>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let strategy = Strategy::from_path(req.uri().path());
    if let Some(strategy) = strategy {
        if req.method() == Method::POST {
            return Ok(serve(&state, strategy, req.into_body()).await);
        }

        let mut response = respond(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
        response
            .headers_mut()
            .insert(ALLOW, HeaderValue::from_static("POST"));
        return Ok(response);
    }

    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let body = state.snapshot().to_prometheus_string();
            with_content_type(
                respond(StatusCode::OK, body),
                "text/plain; version=0.0.4; charset=utf-8",
            )
        }
        (&Method::GET, "/health") => with_content_type(
            respond(StatusCode::OK, "{\"status\":\"ok\"}"),
            "application/json",
        ),
        _ => respond(StatusCode::NOT_FOUND, "Not Found"),
    };

    Ok(response)
}

/// Drain the body with `strategy` and translate the outcome.
async fn serve<B>(state: &AppState, strategy: Strategy, body: B) -> HttpResponse
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let start = Instant::now();
    let outcome = state.drain(strategy, body).await;
    state.metrics().record(strategy, start, &outcome);

    match outcome {
        Ok(_) => respond(StatusCode::OK, Bytes::new()),
        Err(e @ Error::BodyTooLarge { .. }) => {
            debug!("{} rejected body: {}", strategy, e);
            respond(StatusCode::PAYLOAD_TOO_LARGE, e.to_string())
        }
        Err(e) => {
            warn!("{} failed to read body: {}", strategy, e);
            respond(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn respond(status: StatusCode, body: impl Into<Bytes>) -> HttpResponse {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}

fn with_content_type(mut response: HttpResponse, content_type: &'static str) -> HttpResponse {
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
