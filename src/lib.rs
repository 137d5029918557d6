// Switchboard - a class/method HTTP request dispatcher for Rust
//
// Requests of the form `/{Class}/{Method}[.{ext}]` are routed to methods of
// registered handler classes, answered in a negotiated representation and
// wrapped by per-method filters.

// Re-export core functionality
pub use switchboard_core::*;

// Re-export logging
pub use switchboard_log as log;

// Re-export optional crates
#[cfg(feature = "config")]
pub use switchboard_config;

#[cfg(feature = "testing")]
pub use switchboard_testing;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Application, BoundArguments, DispatchConfig, DispatchOutcome, Dispatcher, Environment,
        Error, ErrorPolicy, Filter, HandlerClass, HandlerRegistry, HttpRequest, HttpResponse,
        Method, Next, ParamType, ParameterDescriptor, RequestContext, Verb, VerbSet, async_trait,
        submit_handler,
    };
}
