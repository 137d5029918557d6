// Minimal HTTP/1 host for a dispatcher

use crate::config::DispatchConfig;
use crate::pipeline::Dispatcher;
use crate::route_registry::HandlerRegistry;
use crate::tower_compat::{into_http_response, DispatchService};
use crate::http::HttpResponse;
use crate::Error;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming as IncomingBody;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceExt;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Serves a [`Dispatcher`] over HTTP/1.1.
///
/// ```rust,ignore
/// let registry = Arc::new(HandlerRegistry::new());
/// registry.register_manifest()?;
///
/// Application::new(registry, DispatchConfig::default())
///     .listen(([127, 0, 0, 1], 8080).into())
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Application {
    service: DispatchService,
}

impl Application {
    pub fn new(registry: Arc<HandlerRegistry>, config: DispatchConfig) -> Self {
        Self::from_dispatcher(Dispatcher::new(registry, Arc::new(config)))
    }

    pub fn from_dispatcher(dispatcher: Dispatcher) -> Self {
        Self {
            service: DispatchService::new(dispatcher),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        self.service.dispatcher()
    }

    /// Tower service for embedding in another host.
    pub fn service(&self) -> DispatchService {
        self.service.clone()
    }

    /// Accept connections on `addr` forever.
    pub async fn listen(self, addr: SocketAddr) -> Result<(), Error> {
        self.listen_with_shutdown(addr, std::future::pending()).await
    }

    /// Accept connections on `addr` until `shutdown` completes.
    ///
    /// Connections already accepted are left to finish on their own.
    pub async fn listen_with_shutdown<F>(self, addr: SocketAddr, shutdown: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(addr).await?;
        switchboard_log::info!("Server listening on http://{}", listener.local_addr()?);
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                _ = &mut shutdown => {
                    switchboard_log::info!("Server shutting down");
                    return Ok(());
                }
            };
            let (stream, peer) = match accepted {
                Ok(accepted) => accepted,
                Err(err) => {
                    let backoff = accept_backoff(&err);
                    tracing::warn!(error = %err, ?backoff, "failed to accept connection");
                    if !backoff.is_zero() {
                        tokio::time::sleep(backoff).await;
                    }
                    continue;
                }
            };

            let io = TokioIo::new(stream);
            let dispatch = self.service.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<IncomingBody>| {
                    handle_request(req, dispatch.clone())
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::debug!(%peer, error = %err, "connection closed with error");
                }
            });
        }
    }
}

/// Delay before the next `accept` after a failed one.
///
/// Errors tied to a single peer are retried at once; anything else, such as
/// running out of file descriptors, waits for resources to free up.
fn accept_backoff(err: &io::Error) -> Duration {
    match err.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock => Duration::ZERO,
        _ => ACCEPT_BACKOFF,
    }
}

/// Collect the body, dispatch, and answer 500 when a fault is rethrown.
async fn handle_request(
    req: Request<IncomingBody>,
    service: DispatchService,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            tracing::warn!(error = %err, "failed to read request body");
            return Ok(into_http_response(HttpResponse::new(400)));
        }
    };

    match service.oneshot(Request::from_parts(parts, body)).await {
        Ok(response) => Ok(response),
        Err(err) => {
            tracing::error!(error = %err, "dispatcher rethrew a fault");
            Ok(into_http_response(HttpResponse::new(500)))
        }
    }
}
