//! Tower and `http` crate interoperability.
//!
//! [`DispatchService`] exposes a [`Dispatcher`] as a
//! `tower::Service<http::Request<Bytes>>`, so it can be wrapped in tower
//! middleware or served by any hyper-compatible host.
//!
//! ```rust,ignore
//! use switchboard_core::tower_compat::DispatchService;
//! use tower::{ServiceBuilder, ServiceExt};
//!
//! let service = ServiceBuilder::new()
//!     .concurrency_limit(64)
//!     .service(DispatchService::new(dispatcher));
//! let response = service.oneshot(request).await?;
//! ```

use crate::http::{Environment, HttpRequest, HttpResponse};
use crate::pipeline::Dispatcher;
use crate::Error;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use http::{HeaderName, HeaderValue, Request, Response, StatusCode};
use http_body_util::Full;
use std::task::{Context, Poll};
use tower_service::Service;

// ============================================================================
// HTTP Crate Conversions
// ============================================================================

/// Build a dispatcher request from an `http` request with a collected body.
///
/// Header values that are not visible ASCII are skipped.
pub fn from_http_request(req: Request<Bytes>) -> HttpRequest {
    let (parts, body) = req.into_parts();
    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let mut request = HttpRequest::new(parts.method.as_str(), target);
    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            request.add_header(name.as_str(), value);
        }
    }
    request.body = body.to_vec();
    request
}

/// Convert a dispatcher response into an `http` response.
///
/// An out-of-range status becomes 500; invalid header pairs are dropped.
pub fn into_http_response(response: HttpResponse) -> Response<Full<Bytes>> {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut http_response = Response::new(Full::new(Bytes::from(response.body)));
    *http_response.status_mut() = status;

    let headers = http_response.headers_mut();
    for (name, value) in response.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            headers.insert(name, value);
        }
    }
    http_response
}

// ============================================================================
// Tower Service
// ============================================================================

/// Tower service running every request through a [`Dispatcher`].
///
/// Fails only when the dispatcher rethrows a fault.
#[derive(Debug, Clone)]
pub struct DispatchService {
    dispatcher: Dispatcher,
}

impl DispatchService {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl Service<Request<Bytes>> for DispatchService {
    type Response = Response<Full<Bytes>>;
    type Error = Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Bytes>) -> Self::Future {
        let dispatcher = self.dispatcher.clone();
        Box::pin(async move {
            let mut env = Environment::new(from_http_request(req));
            dispatcher.dispatch(&mut env).await?;
            Ok(into_http_response(env.into_response()))
        })
    }
}
