//! Request dispatch pipeline.
//!
//! [`Dispatcher::dispatch`] takes one request from arrival to a written
//! response:
//!
//! ```text
//! Received ─ route ─┬─ 404/405 ──────────────────────────── Rejected
//!                   └─ negotiate ─┬─ 406 ────────────────── Rejected
//!                                 └─ bind ─┬─ None ──────── BinderFailed
//!                                          └─ filters+handler ─┬─ Ok ── Responded
//!                                                              └─ Err ─ Faulted
//! ```
//!
//! Every request ends in exactly one [`DispatchOutcome`]. Explicit status
//! signals raised by a filter or handler count as `Responded`.

use crate::config::{DispatchConfig, ErrorPolicy};
use crate::context::RequestContext;
use crate::http::Environment;
use crate::interceptor::Next;
use crate::route_registry::HandlerRegistry;
use crate::routing::Router;
use crate::Error;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Terminal state of one dispatched request, with the status written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Routing or negotiation refused the request (404, 405, 406).
    Rejected(u16),
    /// The binder wrote its own response.
    BinderFailed(u16),
    /// The handler's value, or an explicit status signal, was written.
    Responded(u16),
    /// An unexpected error was answered according to the error policy.
    Faulted(u16),
}

impl DispatchOutcome {
    pub fn status(&self) -> u16 {
        match *self {
            DispatchOutcome::Rejected(s)
            | DispatchOutcome::BinderFailed(s)
            | DispatchOutcome::Responded(s)
            | DispatchOutcome::Faulted(s) => s,
        }
    }
}

/// Routes, negotiates, binds and executes requests against a sealed registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    router: Router,
    config: Arc<DispatchConfig>,
}

impl Dispatcher {
    pub fn new(registry: Arc<HandlerRegistry>, config: Arc<DispatchConfig>) -> Self {
        Self {
            router: Router::new(registry, config.default_verbs),
            config,
        }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        self.router.registry()
    }

    pub fn config(&self) -> &Arc<DispatchConfig> {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Dispatch one request, writing the response into `env`.
    ///
    /// Returns `Err` only under [`ErrorPolicy::Rethrow`], in which case the
    /// response is left for the host to fill.
    pub async fn dispatch(&self, env: &mut Environment) -> Result<DispatchOutcome, Error> {
        tracing::debug!(
            method = %env.request.method,
            path = %env.request.path,
            "dispatching request"
        );

        let route = match self.router.route(&env.request.path, &env.request.method) {
            Ok(route) => route,
            Err(e) => return Ok(reject(env, e)),
        };

        let formatter = match self
            .config
            .formatters
            .select(route.extension.as_deref(), env.request.header_values("accept"))
        {
            Ok(formatter) => formatter,
            Err(e) => return Ok(reject(env, e)),
        };

        let descriptor = route.descriptor.clone();
        let bound = AssertUnwindSafe(self.config.binder.bind(env, &self.config, descriptor.params()))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(Error::Panic("binder panicked".to_string())));
        let arguments = match bound {
            Ok(Some(arguments)) => arguments,
            Ok(None) => {
                let status = env.response.status;
                tracing::debug!(key = %route.key, status, "binder answered the request");
                return Ok(DispatchOutcome::BinderFailed(status));
            }
            Err(e) => return self.fault(env, e),
        };

        let result = {
            let mut ctx = RequestContext::new(
                route.key,
                route.verb,
                route.extension,
                formatter.clone(),
                descriptor.clone(),
                env,
            );
            ctx.set_arguments(arguments);
            AssertUnwindSafe(Next::new(descriptor.filters(), &descriptor).run(&mut ctx))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(Error::Panic("filter panicked".to_string())))
        };

        match result {
            Ok(value) => match formatter.serialize(&value) {
                Ok(bytes) => {
                    let response = &mut env.response;
                    response.set_status(200);
                    response.set_header("Content-Type", formatter.media_type());
                    response.body = bytes;
                    Ok(DispatchOutcome::Responded(200))
                }
                Err(e) => self.fault(env, e),
            },
            Err(Error::Status { code, body }) => {
                let response = &mut env.response;
                response.set_status(code);
                response.body = body;
                Ok(DispatchOutcome::Responded(code))
            }
            Err(e) => self.fault(env, e),
        }
    }

    fn fault(&self, env: &mut Environment, err: Error) -> Result<DispatchOutcome, Error> {
        tracing::error!(
            path = %env.request.path,
            error = %err,
            policy = ?self.config.error_policy,
            "unhandled dispatch fault"
        );

        let response = &mut env.response;
        match self.config.error_policy {
            ErrorPolicy::InternalServerErrorOnly => {
                response.reset(500);
                Ok(DispatchOutcome::Faulted(500))
            }
            ErrorPolicy::IncludeErrorDetails => {
                response.reset(500);
                response.set_header("Content-Type", "text/plain");
                response.write(err.to_string().as_bytes());
                Ok(DispatchOutcome::Faulted(500))
            }
            ErrorPolicy::Rethrow => Err(err),
        }
    }
}

fn reject(env: &mut Environment, err: Error) -> DispatchOutcome {
    let status = err.status_code();
    tracing::warn!(
        method = %env.request.method,
        path = %env.request.path,
        status,
        error = %err,
        "request rejected"
    );

    let body = serde_json::json!({
        "error": err.to_string(),
        "status": status,
    });
    let response = &mut env.response;
    response.reset(status);
    response.set_header("Content-Type", "application/json");
    response.write(body.to_string().as_bytes());
    DispatchOutcome::Rejected(status)
}
