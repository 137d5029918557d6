// Per-request dispatch context

use crate::formatter::Formatter;
use crate::handler::{BoundArguments, HandlerDescriptor};
use crate::http::{Environment, HttpRequest, HttpResponse};
use crate::routing::RoutingKey;
use crate::verb::Verb;
use serde_json::Value;
use std::sync::Arc;

/// Everything known about one request once it has been routed, negotiated
/// and bound. Filters receive it mutably; it is never shared between requests.
pub struct RequestContext<'env> {
    key: RoutingKey,
    verb: Verb,
    extension: Option<String>,
    formatter: Arc<dyn Formatter>,
    descriptor: Arc<HandlerDescriptor>,
    arguments: BoundArguments,
    env: &'env mut Environment,
}

impl<'env> RequestContext<'env> {
    pub fn new(
        key: RoutingKey,
        verb: Verb,
        extension: Option<String>,
        formatter: Arc<dyn Formatter>,
        descriptor: Arc<HandlerDescriptor>,
        env: &'env mut Environment,
    ) -> Self {
        Self {
            key,
            verb,
            extension,
            formatter,
            descriptor,
            arguments: BoundArguments::new(),
            env,
        }
    }

    pub fn key(&self) -> &RoutingKey {
        &self.key
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// Formatter chosen by content negotiation.
    pub fn formatter(&self) -> &Arc<dyn Formatter> {
        &self.formatter
    }

    pub fn descriptor(&self) -> &Arc<HandlerDescriptor> {
        &self.descriptor
    }

    pub fn arguments(&self) -> &BoundArguments {
        &self.arguments
    }

    pub fn arguments_mut(&mut self) -> &mut BoundArguments {
        &mut self.arguments
    }

    pub fn set_arguments(&mut self, arguments: BoundArguments) {
        self.arguments = arguments;
    }

    pub fn request(&self) -> &HttpRequest {
        &self.env.request
    }

    pub fn response(&self) -> &HttpResponse {
        &self.env.response
    }

    pub fn response_mut(&mut self) -> &mut HttpResponse {
        &mut self.env.response
    }

    pub fn environment(&self) -> &Environment {
        self.env
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        self.env
    }

    pub fn item(&self, key: &str) -> Option<&Value> {
        self.env.item(key)
    }

    pub fn set_item(&mut self, key: impl Into<String>, value: Value) {
        self.env.set_item(key, value);
    }
}

impl std::fmt::Debug for RequestContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("key", &self.key)
            .field("verb", &self.verb)
            .field("extension", &self.extension)
            .field("formatter", &self.formatter.extension())
            .field("arguments", &self.arguments)
            .finish()
    }
}
