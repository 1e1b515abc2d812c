//! Logging stage: one structured event per completed call
//!
//! Reads the [`CallTags`] attached by the tagging stage and emits a single
//! `tracing` event when the call completes, at a severity derived from the
//! gRPC status code.
//!
//! The status is taken from the `grpc-status` response header, which tonic
//! sets on trailers-only responses (immediate errors). A mid-stream failure
//! status travels in HTTP trailers and is not visible to transport-level
//! middleware; such calls are logged with the OK code.

use crate::tags::CallTags;
use pin_project::pin_project;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tonic::Code;
use tower::{Layer, Service};
use tracing::Level;

/// Layer producing [`LoggingService`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingLayer;

impl LoggingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = LoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoggingService { inner }
    }
}

/// Emits one log record per call using the tags attached upstream.
///
/// Wraps but never alters the call: the response and any transport error
/// pass through unmodified.
#[derive(Debug, Clone)]
pub struct LoggingService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<http::Request<ReqBody>> for LoggingService<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<ResBody>>,
    S::Error: fmt::Display,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = LoggingFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<ReqBody>) -> Self::Future {
        // Tags are attached by the tagging stage; fall back to the path so a
        // mis-stacked chain still produces an identifiable record.
        let tags = req
            .extensions()
            .get::<CallTags>()
            .cloned()
            .unwrap_or_else(|| CallTags::from_path(req.uri().path()));

        LoggingFuture {
            inner: self.inner.call(req),
            tags,
            started: Instant::now(),
        }
    }
}

/// Response future that logs on completion.
#[pin_project]
pub struct LoggingFuture<F> {
    #[pin]
    inner: F,
    tags: CallTags,
    started: Instant,
}

impl<F, ResBody, E> Future for LoggingFuture<F>
where
    F: Future<Output = Result<http::Response<ResBody>, E>>,
    E: fmt::Display,
{
    type Output = Result<http::Response<ResBody>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        match this.inner.poll(cx) {
            Poll::Ready(Ok(response)) => {
                let code = status_from_headers(response.headers());
                emit_call_record(this.tags, code, this.started.elapsed());
                Poll::Ready(Ok(response))
            }
            Poll::Ready(Err(err)) => {
                tracing::error!(
                    grpc.service = %this.tags.service(),
                    grpc.method = %this.tags.method(),
                    error = %err,
                    "gRPC call failed in transport"
                );
                Poll::Ready(Err(err))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Default gRPC code to log severity mapping.
///
/// Client-attributable and informational codes log at INFO, contention and
/// availability codes at WARN, server faults at ERROR. The logging backend
/// owns any further filtering.
pub fn default_code_level(code: Code) -> Level {
    match code {
        Code::Ok
        | Code::Cancelled
        | Code::InvalidArgument
        | Code::NotFound
        | Code::AlreadyExists
        | Code::Unauthenticated => Level::INFO,
        Code::DeadlineExceeded
        | Code::PermissionDenied
        | Code::ResourceExhausted
        | Code::FailedPrecondition
        | Code::Aborted
        | Code::OutOfRange
        | Code::Unavailable => Level::WARN,
        Code::Unknown | Code::Unimplemented | Code::Internal | Code::DataLoss => Level::ERROR,
    }
}

fn status_from_headers(headers: &http::HeaderMap) -> Code {
    headers
        .get("grpc-status")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i32>().ok())
        .map(Code::from_i32)
        .unwrap_or(Code::Ok)
}

fn emit_call_record(tags: &CallTags, code: Code, elapsed: Duration) {
    let duration_ms = elapsed.as_millis() as u64;
    let extra = tags
        .fields()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ");

    // tracing levels are static per macro call site.
    match default_code_level(code) {
        Level::ERROR => tracing::error!(
            grpc.service = %tags.service(),
            grpc.method = %tags.method(),
            grpc.code = ?code,
            grpc.duration_ms = duration_ms,
            grpc.tags = %extra,
            "finished gRPC call"
        ),
        Level::WARN => tracing::warn!(
            grpc.service = %tags.service(),
            grpc.method = %tags.method(),
            grpc.code = ?code,
            grpc.duration_ms = duration_ms,
            grpc.tags = %extra,
            "finished gRPC call"
        ),
        _ => tracing::info!(
            grpc.service = %tags.service(),
            grpc.method = %tags.method(),
            grpc.code = ?code,
            grpc.duration_ms = duration_ms,
            grpc.tags = %extra,
            "finished gRPC call"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_level_defaults() {
        assert_eq!(default_code_level(Code::Ok), Level::INFO);
        assert_eq!(default_code_level(Code::Cancelled), Level::INFO);
        assert_eq!(default_code_level(Code::Unavailable), Level::WARN);
        assert_eq!(default_code_level(Code::ResourceExhausted), Level::WARN);
        assert_eq!(default_code_level(Code::Internal), Level::ERROR);
        assert_eq!(default_code_level(Code::DataLoss), Level::ERROR);
    }

    #[test]
    fn status_header_parsing() {
        let mut headers = http::HeaderMap::new();
        assert_eq!(status_from_headers(&headers), Code::Ok);

        headers.insert("grpc-status", "13".parse().unwrap());
        assert_eq!(status_from_headers(&headers), Code::Internal);

        headers.insert("grpc-status", "garbage".parse().unwrap());
        assert_eq!(status_from_headers(&headers), Code::Ok);
    }
}
