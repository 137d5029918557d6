//! # Switchboard Core
//!
//! Dispatch core of Switchboard: routes `/{Class}/{Method}[.{ext}]` requests
//! to methods of registered handler classes, negotiates the response
//! representation, binds parameters, runs filters around the call and writes
//! the result.
//!
//! ## Overview
//!
//! - [`HandlerRegistry`] builds the immutable routing table once, in parallel
//! - [`Router`] maps a path and verb to a [`HandlerDescriptor`]
//! - [`FormatterRegistry`] picks a [`Formatter`] from the extension or `Accept`
//! - [`Dispatcher`] drives binding, filters, invocation and error policy
//! - [`DispatchService`] and [`Application`] put it behind tower and hyper
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use switchboard_core::*;
//!
//! #[derive(Default)]
//! struct Calculator;
//!
//! let registry = Arc::new(HandlerRegistry::new());
//! registry
//!     .register(vec![
//!         HandlerClass::of::<Calculator>("Calculator")
//!             .method(
//!                 Method::new("Add", |_: Calculator, args| async move {
//!                     Ok(args.take::<i64>("a")? + args.take::<i64>("b")?)
//!                 })
//!                 .param(ParameterDescriptor::query("a", ParamType::Integer))
//!                 .param(ParameterDescriptor::query("b", ParamType::Integer)),
//!             )
//!             .build(),
//!     ])
//!     .unwrap();
//!
//! let dispatcher = Dispatcher::new(registry, Arc::new(DispatchConfig::default()));
//! let mut env = Environment::new(HttpRequest::new("GET", "/Calculator/Add?a=1&b=2"));
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let outcome = runtime.block_on(dispatcher.dispatch(&mut env)).unwrap();
//! assert_eq!(outcome, DispatchOutcome::Responded(200));
//! assert_eq!(env.response.body, b"3");
//! ```

pub mod application;
pub mod binder;
pub mod config;
pub mod content_negotiation;
pub mod context;
pub mod error;
pub mod formatter;
pub mod handler;
pub mod http;
pub mod interceptor;
pub mod pipeline;
pub mod route_registry;
pub mod routing;
pub mod tower_compat;
pub mod verb;

pub use application::Application;
pub use binder::{DefaultBinder, ParameterBinder};
pub use config::{DispatchConfig, DispatchConfigBuilder, ErrorPolicy};
pub use content_negotiation::FormatterRegistry;
pub use context::RequestContext;
pub use error::{Error, RegistrationError};
pub use formatter::{Formatter, FormatterCatalog, JsonFormatter, PlainTextFormatter, XmlFormatter};
pub use handler::{
    BoundArguments, ClassBuilder, HandlerClass, HandlerDescriptor, Method, MethodKind,
    ParamSource, ParamType, ParameterDescriptor,
};
pub use self::http::{Environment, HttpRequest, HttpResponse};
pub use interceptor::{Filter, FnFilter, HeaderFilter, LoggingFilter, Next};
pub use pipeline::{DispatchOutcome, Dispatcher};
pub use route_registry::{HandlerManifest, HandlerRegistry, Registration, RegistryState};
pub use routing::{RouteMatch, Router, RoutingKey};
pub use tower_compat::DispatchService;
pub use verb::{Verb, VerbSet};

// Used by `submit_handler!`.
#[doc(hidden)]
pub use inventory;

// Re-exported for implementing `Filter` and `ParameterBinder`.
pub use async_trait::async_trait;
