// Filters wrapping handler invocation

use crate::context::RequestContext;
use crate::handler::HandlerDescriptor;
use crate::Error;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Cross-cutting behaviour attached to a handler method.
///
/// Filters run in the order they were attached, the first one outermost.
/// Each decides whether to call `next`; returning without doing so
/// short-circuits the handler. Returning `Err(Error::Status { .. })` makes the
/// dispatcher answer with that exact status.
#[async_trait]
pub trait Filter: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn intercept(
        &self,
        ctx: &mut RequestContext<'_>,
        next: Next<'_>,
    ) -> Result<Value, Error>;
}

/// The rest of the filter chain, ending in the handler itself.
pub struct Next<'a> {
    filters: &'a [Arc<dyn Filter>],
    descriptor: &'a HandlerDescriptor,
}

impl<'a> Next<'a> {
    pub fn new(filters: &'a [Arc<dyn Filter>], descriptor: &'a HandlerDescriptor) -> Self {
        Self {
            filters,
            descriptor,
        }
    }

    /// Number of filters still to run.
    pub fn remaining(&self) -> usize {
        self.filters.len()
    }

    /// Run the remaining filters, then the handler.
    pub fn run<'c>(self, ctx: &'c mut RequestContext<'_>) -> BoxFuture<'c, Result<Value, Error>>
    where
        'a: 'c,
    {
        Box::pin(async move {
            match self.filters.split_first() {
                Some((filter, rest)) => {
                    tracing::trace!(filter = filter.name(), key = %ctx.key(), "entering filter");
                    filter.intercept(ctx, Next::new(rest, self.descriptor)).await
                }
                None => self.descriptor.invoke(ctx.arguments().clone()).await,
            }
        })
    }
}

/// Records the duration and outcome of each invocation.
#[derive(Debug, Clone, Default)]
pub struct LoggingFilter;

#[async_trait]
impl Filter for LoggingFilter {
    fn name(&self) -> &str {
        "logging"
    }

    async fn intercept(
        &self,
        ctx: &mut RequestContext<'_>,
        next: Next<'_>,
    ) -> Result<Value, Error> {
        let start = Instant::now();
        let key = ctx.key().to_string();
        let verb = ctx.verb();

        let result = next.run(ctx).await;

        let elapsed = start.elapsed();
        match &result {
            Ok(_) => tracing::info!(%key, %verb, ?elapsed, "handler completed"),
            Err(e) => tracing::warn!(%key, %verb, ?elapsed, error = %e, "handler failed"),
        }
        result
    }
}

/// Runs a synchronous check before the handler. An `Err` stops the chain.
///
/// ```
/// use switchboard_core::interceptor::FnFilter;
/// use switchboard_core::Error;
///
/// let require_token = FnFilter::new("token", |ctx| {
///     match ctx.request().header("x-token") {
///         Some(_) => Ok(()),
///         None => Err(Error::status(401)),
///     }
/// });
/// ```
pub struct FnFilter<F> {
    name: String,
    check: F,
}

impl<F> FnFilter<F>
where
    F: Fn(&mut RequestContext<'_>) -> Result<(), Error> + Send + Sync,
{
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

#[async_trait]
impl<F> Filter for FnFilter<F>
where
    F: Fn(&mut RequestContext<'_>) -> Result<(), Error> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn intercept(
        &self,
        ctx: &mut RequestContext<'_>,
        next: Next<'_>,
    ) -> Result<Value, Error> {
        (self.check)(ctx)?;
        next.run(ctx).await
    }
}

/// Sets a response header once the handler has succeeded.
#[derive(Debug, Clone)]
pub struct HeaderFilter {
    name: String,
    value: String,
}

impl HeaderFilter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[async_trait]
impl Filter for HeaderFilter {
    fn name(&self) -> &str {
        "header"
    }

    async fn intercept(
        &self,
        ctx: &mut RequestContext<'_>,
        next: Next<'_>,
    ) -> Result<Value, Error> {
        let value = next.run(ctx).await?;
        ctx.response_mut()
            .set_header(self.name.clone(), self.value.clone());
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::JsonFormatter;
    use crate::handler::{BoundArguments, HandlerClass, Method};
    use crate::http::{Environment, HttpRequest};
    use crate::route_registry::HandlerRegistry;
    use crate::routing::RoutingKey;
    use crate::verb::Verb;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct Echo;

    /// Appends its tag to a shared trace on the way in and out.
    struct Tracer {
        tag: &'static str,
        trace: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Filter for Tracer {
        async fn intercept(
            &self,
            ctx: &mut RequestContext<'_>,
            next: Next<'_>,
        ) -> Result<Value, Error> {
            self.trace.lock().push(format!("{}>", self.tag));
            let result = next.run(ctx).await;
            self.trace.lock().push(format!("<{}", self.tag));
            result
        }
    }

    fn descriptor(method: Method<Echo>) -> Arc<crate::handler::HandlerDescriptor> {
        let registry = HandlerRegistry::new();
        registry
            .register(vec![HandlerClass::of::<Echo>("Echo").method(method).build()])
            .unwrap();
        registry.keys().first().and_then(|k| registry.lookup(k)).unwrap()
    }

    async fn run_chain(
        descriptor: Arc<crate::handler::HandlerDescriptor>,
        env: &mut Environment,
        args: BoundArguments,
    ) -> Result<Value, Error> {
        let mut ctx = RequestContext::new(
            RoutingKey::new("Echo", "Say"),
            Verb::Get,
            None,
            Arc::new(JsonFormatter::new()),
            descriptor.clone(),
            env,
        );
        ctx.set_arguments(args);
        Next::new(descriptor.filters(), &descriptor).run(&mut ctx).await
    }

    #[tokio::test]
    async fn test_filters_run_outermost_first() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let inner_trace = trace.clone();
        let method = Method::new("Say", move |_: Echo, _| {
            let trace = inner_trace.clone();
            async move {
                trace.lock().push("handler".to_string());
                Ok("hi")
            }
        })
        .filter(Tracer {
            tag: "a",
            trace: trace.clone(),
        })
        .filter(Tracer {
            tag: "b",
            trace: trace.clone(),
        });

        let mut env = Environment::new(HttpRequest::new("GET", "/Echo/Say"));
        let value = run_chain(descriptor(method), &mut env, BoundArguments::new())
            .await
            .unwrap();

        assert_eq!(value, json!("hi"));
        assert_eq!(*trace.lock(), vec!["a>", "b>", "handler", "<b", "<a"]);
    }

    #[tokio::test]
    async fn test_fn_filter_short_circuits() {
        let method = Method::new("Say", |_: Echo, _| async move {
            if true {
                panic!("handler must not run");
            }
            Ok(())
        })
        .filter(FnFilter::new("deny", |_ctx| Err(Error::status(403))));

        let mut env = Environment::new(HttpRequest::new("GET", "/Echo/Say"));
        let err = run_chain(descriptor(method), &mut env, BoundArguments::new())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_filter_sees_and_rewrites_arguments() {
        let method = Method::new("Say", |_: Echo, args| async move { args.take::<String>("word") })
            .filter(FnFilter::new("upper", |ctx| {
                let word = ctx
                    .arguments()
                    .get("word")
                    .and_then(Value::as_str)
                    .map(str::to_uppercase)
                    .unwrap_or_default();
                ctx.arguments_mut().set("word", word);
                Ok(())
            }));

        let mut env = Environment::new(HttpRequest::new("GET", "/Echo/Say"));
        let value = run_chain(
            descriptor(method),
            &mut env,
            BoundArguments::new().with("word", "quiet"),
        )
        .await
        .unwrap();
        assert_eq!(value, json!("QUIET"));
    }

    #[tokio::test]
    async fn test_header_filter_only_on_success() {
        let ok = Method::new("Say", |_: Echo, _| async move { Ok(1) })
            .filter(HeaderFilter::new("X-Handled", "yes"));
        let mut env = Environment::new(HttpRequest::new("GET", "/Echo/Say"));
        run_chain(descriptor(ok), &mut env, BoundArguments::new())
            .await
            .unwrap();
        assert_eq!(env.response.header("x-handled"), Some("yes"));

        let failing = Method::new("Say", |_: Echo, _| async move {
            Err::<(), _>(Error::handler("boom"))
        })
        .filter(HeaderFilter::new("X-Handled", "yes"))
        .filter(LoggingFilter);
        let mut env = Environment::new(HttpRequest::new("GET", "/Echo/Say"));
        assert!(
            run_chain(descriptor(failing), &mut env, BoundArguments::new())
                .await
                .is_err()
        );
        assert!(env.response.header("x-handled").is_none());
    }
}
