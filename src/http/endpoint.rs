//! Type-erased request handler used to compose the pipeline.

use std::convert::Infallible;
use std::fmt;
use std::future::Future;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use futures_util::future::{BoxFuture, FutureExt};
use tower::util::BoxCloneSyncService;
use tower::{service_fn, ServiceExt};

pub type EndpointFuture = BoxFuture<'static, Response>;

/// The boxed tower service behind an [`Endpoint`].
pub type EndpointService = BoxCloneSyncService<Request<Body>, Response, Infallible>;

/// A cloneable async `Request -> Response` function.
///
/// Each middleware turns one `Endpoint` into another; the outermost one is
/// handed to axum as the fallback service.
#[derive(Clone)]
pub struct Endpoint {
    service: EndpointService,
}

impl Endpoint {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Request<Body>) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let service = service_fn(move |req| {
            let fut = f(req);
            async move { Ok::<_, Infallible>(fut.await) }
        });
        Self {
            service: BoxCloneSyncService::new(service),
        }
    }

    pub fn call(&self, req: Request<Body>) -> EndpointFuture {
        self.service
            .clone()
            .oneshot(req)
            .map(|result| match result {
                Ok(response) => response,
                Err(never) => match never {},
            })
            .boxed()
    }

    pub fn into_service(self) -> EndpointService {
        self.service
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    fn echo_path() -> Endpoint {
        Endpoint::new(|req: Request<Body>| async move {
            (StatusCode::OK, req.uri().path().to_string()).into_response()
        })
    }

    #[tokio::test]
    async fn test_call_and_service_agree() {
        let endpoint = echo_path();
        let direct = endpoint.call(Request::get("/a").body(Body::empty()).unwrap()).await;
        assert_eq!(direct.status(), StatusCode::OK);

        let service = endpoint.clone().into_service();
        let via_service = service
            .oneshot(Request::get("/b").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(via_service.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"/b");

        // The original is still usable after handing out the service.
        let again = endpoint.call(Request::get("/c").body(Body::empty()).unwrap()).await;
        assert_eq!(again.status(), StatusCode::OK);
    }
}
