//! Request tagging and logging middleware for the gRPC server
//!
//! A fixed two-stage interceptor chain applied at the transport level, so
//! unary and streaming calls go through the same stages:
//!
//! 1. **Tagging** ([`TaggingLayer`]): derives a [`CallTags`] field set from
//!    the RPC path and attaches it to the request extensions for the
//!    duration of the call.
//! 2. **Logging** ([`LoggingLayer`]): emits one structured `tracing` event
//!    per call, carrying the tags attached by stage 1 and the completion
//!    status mapped to a severity level.
//!
//! The order is significant: logging reads tags that tagging attached, so
//! [`ObservabilityLayer`] composes the two with tagging outermost. Extra
//! stages (metrics, authentication) stack around it via
//! `tower::ServiceBuilder` without disturbing that order.
//!
//! ```rust,ignore
//! use grpc_observability::ObservabilityLayer;
//! use tonic::transport::Server;
//!
//! let server = Server::builder()
//!     .layer(ObservabilityLayer::new())
//!     .add_service(my_service);
//! ```
//!
//! The stages wrap but never alter RPC semantics: no retries, no
//! backpressure, no added latency beyond tag construction and one log
//! emission per call.

mod logging;
mod tagging;
mod tags;

pub use logging::{default_code_level, LoggingLayer, LoggingService};
pub use tagging::{TaggingLayer, TaggingService};
pub use tags::CallTags;

use tower::Layer;

/// The fixed tagging-then-logging chain as a single layer.
///
/// Construction is pure and infallible; two instances produce functionally
/// equivalent chains. The composed service is immutable after construction
/// and shared read-only across all calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObservabilityLayer;

impl ObservabilityLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for ObservabilityLayer {
    // Tagging wraps logging so tags exist before the logging stage runs.
    type Service = TaggingService<LoggingService<S>>;

    fn layer(&self, inner: S) -> Self::Service {
        TaggingLayer::new().layer(LoggingLayer::new().layer(inner))
    }
}
