//! Tagging stage: attach [`CallTags`] to every request

use crate::tags::CallTags;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Layer producing [`TaggingService`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TaggingLayer;

impl TaggingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for TaggingLayer {
    type Service = TaggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TaggingService { inner }
    }
}

/// Derives [`CallTags`] from the request path and stores them in the
/// request extensions before forwarding. Stateless; never fails a call.
#[derive(Debug, Clone)]
pub struct TaggingService<S> {
    inner: S,
}

impl<S, ReqBody> Service<http::Request<ReqBody>> for TaggingService<S>
where
    S: Service<http::Request<ReqBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<ReqBody>) -> Self::Future {
        let tags = CallTags::from_path(req.uri().path());
        req.extensions_mut().insert(tags);
        self.inner.call(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Request, Response};
    use std::convert::Infallible;
    use tower::{service_fn, ServiceExt};

    #[tokio::test]
    async fn inserts_tags_into_extensions() {
        let svc = TaggingLayer::new().layer(service_fn(|req: Request<()>| async move {
            let tags = req.extensions().get::<CallTags>().expect("tags missing");
            assert_eq!(tags.service(), "api.GatewayService");
            assert_eq!(tags.method(), "CreateGateway");
            Ok::<_, Infallible>(Response::new(()))
        }));

        let req = Request::builder()
            .uri("/api.GatewayService/CreateGateway")
            .body(())
            .unwrap();
        svc.oneshot(req).await.unwrap();
    }
}
