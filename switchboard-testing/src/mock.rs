// Mock handlers and recording filters

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use switchboard_core::{
    BoundArguments, Error, Filter, HandlerClass, Method, Next, ParameterDescriptor,
    RequestContext,
};

type CallLog = Arc<Mutex<Vec<(String, BoundArguments)>>>;

/// Instance type behind every [`MockHandler`] class.
#[derive(Debug, Default)]
pub struct MockInstance;

/// Builds handler classes whose methods record each call and answer with a
/// canned value (`null` unless configured).
#[derive(Clone, Default)]
pub struct MockHandler {
    calls: CallLog,
    returns: Arc<Mutex<HashMap<String, Value>>>,
}

impl MockHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer calls to `method` with `value`.
    pub fn returning(self, method: &str, value: impl Into<Value>) -> Self {
        self.returns.lock().insert(method.to_string(), value.into());
        self
    }

    /// A routable method that records its call.
    pub fn method(&self, name: &str) -> Method<MockInstance> {
        let calls = Arc::clone(&self.calls);
        let returns = Arc::clone(&self.returns);
        let method = name.to_string();
        Method::new(name, move |_: MockInstance, args: BoundArguments| {
            calls.lock().push((method.clone(), args));
            let value = returns.lock().get(&method).cloned().unwrap_or(Value::Null);
            async move { Ok(value) }
        })
    }

    /// Class `class` exposing one recording method per name.
    pub fn class(&self, class: &str, methods: &[&str]) -> HandlerClass {
        methods
            .iter()
            .fold(HandlerClass::of::<MockInstance>(class), |builder, name| {
                builder.method(self.method(name))
            })
            .build()
    }

    /// Class with a single recording method taking `params`.
    pub fn class_with_params(
        &self,
        class: &str,
        method: &str,
        params: Vec<ParameterDescriptor>,
    ) -> HandlerClass {
        let method = params
            .into_iter()
            .fold(self.method(method), |m, p| m.param(p));
        HandlerClass::of::<MockInstance>(class).method(method).build()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn method_call_count(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|(m, _)| m == method).count()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.method_call_count(method) > 0
    }

    /// Arguments of the most recent call to `method`.
    pub fn last_arguments(&self, method: &str) -> Option<BoundArguments> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find(|(m, _)| m == method)
            .map(|(_, args)| args.clone())
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

/// Shared journal written by [`RecordingFilter`]s.
#[derive(Debug, Clone, Default)]
pub struct FilterJournal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl FilterJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// A filter named `name` that writes `name:before` and `name:after`.
    pub fn filter(&self, name: &str) -> RecordingFilter {
        RecordingFilter {
            name: name.to_string(),
            journal: self.clone(),
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    fn push(&self, entry: String) {
        self.entries.lock().push(entry);
    }
}

/// Records when it is entered and when the inner chain returns.
#[derive(Debug, Clone)]
pub struct RecordingFilter {
    name: String,
    journal: FilterJournal,
}

#[async_trait]
impl Filter for RecordingFilter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn intercept(
        &self,
        ctx: &mut RequestContext<'_>,
        next: Next<'_>,
    ) -> Result<Value, Error> {
        self.journal.push(format!("{}:before", self.name));
        let result = next.run(ctx).await;
        self.journal.push(format!("{}:after", self.name));
        result
    }
}
