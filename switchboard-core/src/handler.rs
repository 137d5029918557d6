// Handler classes, their methods, and the descriptors the registry builds from them
//
// A handler class is a plain Rust type plus an explicit description: its routable
// name, a zero-argument constructor and a list of methods. Each method is an
// async closure taking a fresh instance and the bound arguments. The typed
// closures are erased into `Invoker`s at build time so descriptors of different
// classes can share one table.

use crate::interceptor::Filter;
use crate::routing::RoutingKey;
use crate::verb::{Verb, VerbSet};
use crate::Error;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Names reserved for object infrastructure; never routable.
pub const RESERVED_METHOD_NAMES: [&str; 4] = ["equals", "hash", "type_name", "to_string"];

/// A freshly constructed handler instance.
pub type Instance = Box<dyn Any + Send>;

/// Zero-argument constructor of a handler class.
pub type Constructor = Arc<dyn Fn() -> Instance + Send + Sync>;

/// Type-erased method body.
pub type Invoker =
    Arc<dyn Fn(Instance, BoundArguments) -> BoxFuture<'static, Result<Value, Error>> + Send + Sync>;

// ============================================================================
// Parameters
// ============================================================================

/// Semantic type a parameter is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Float,
    Boolean,
    /// Any JSON value, passed through untouched.
    Json,
}

/// Where the binder should look for a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamSource {
    Query,
    Header,
    /// The whole request body.
    Body,
    /// Query string, then a field of a JSON object body, then a header.
    Any,
}

/// Declared parameter of a handler method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    pub ty: ParamType,
    pub source: ParamSource,
    pub required: bool,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>, ty: ParamType, source: ParamSource) -> Self {
        Self {
            name: name.into(),
            ty,
            source,
            required: true,
        }
    }

    pub fn query(name: impl Into<String>, ty: ParamType) -> Self {
        Self::new(name, ty, ParamSource::Query)
    }

    pub fn header(name: impl Into<String>, ty: ParamType) -> Self {
        Self::new(name, ty, ParamSource::Header)
    }

    pub fn body(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Json, ParamSource::Body)
    }

    pub fn any(name: impl Into<String>, ty: ParamType) -> Self {
        Self::new(name, ty, ParamSource::Any)
    }

    /// Missing values bind as `null` instead of failing.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Parameter values produced by the binder, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArguments {
    values: Vec<(String, Value)>,
}

impl BoundArguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Replace a value in place. Returns `false` if no such argument exists.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> bool {
        match self.values.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => {
                slot.1 = value.into();
                true
            }
            None => false,
        }
    }

    /// Deserialize one argument into a concrete type.
    pub fn take<T: DeserializeOwned>(&self, name: &str) -> Result<T, Error> {
        let value = self
            .get(name)
            .ok_or_else(|| Error::BadRequest(format!("missing argument '{}'", name)))?;
        serde_json::from_value(value.clone())
            .map_err(|e| Error::BadRequest(format!("argument '{}': {}", name, e)))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }
}

// ============================================================================
// Methods
// ============================================================================

/// Whether a method is an operation or a property accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Operation,
    /// Getter/setter style member; excluded from routing.
    Accessor,
}

/// Type-erased method declaration, as handed to the registry.
#[derive(Clone)]
pub struct MethodRegistration {
    pub name: String,
    pub kind: MethodKind,
    pub params: Vec<ParameterDescriptor>,
    pub filters: Vec<Arc<dyn Filter>>,
    pub verbs: Option<VerbSet>,
    pub invoker: Invoker,
}

impl MethodRegistration {
    /// Routable: an operation whose name is not reserved.
    pub fn is_routable(&self) -> bool {
        self.kind == MethodKind::Operation && !RESERVED_METHOD_NAMES.contains(&self.name.as_str())
    }
}

impl fmt::Debug for MethodRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRegistration")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("params", &self.params)
            .field("filters", &self.filters.len())
            .field("verbs", &self.verbs)
            .finish()
    }
}

/// Typed method declaration for handler class `T`.
///
/// ```
/// use switchboard_core::handler::{Method, ParameterDescriptor, ParamType};
///
/// #[derive(Default)]
/// struct Greeter;
///
/// let hello = Method::new("Hello", |_: Greeter, args| async move {
///     let name: String = args.take("name")?;
///     Ok(format!("Hello, {}!", name))
/// })
/// .param(ParameterDescriptor::query("name", ParamType::String))
/// .get_only();
/// ```
pub struct Method<T> {
    registration: MethodRegistration,
    _class: PhantomData<fn(T)>,
}

impl<T: Send + 'static> Method<T> {
    pub fn new<F, Fut, R>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(T, BoundArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Error>> + Send + 'static,
        R: Serialize,
    {
        Self::with_kind(name, MethodKind::Operation, body)
    }

    /// Declare a property accessor. Accessors are described but never routed.
    pub fn accessor<F, Fut, R>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(T, BoundArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Error>> + Send + 'static,
        R: Serialize,
    {
        Self::with_kind(name, MethodKind::Accessor, body)
    }

    fn with_kind<F, Fut, R>(name: impl Into<String>, kind: MethodKind, body: F) -> Self
    where
        F: Fn(T, BoundArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Error>> + Send + 'static,
        R: Serialize,
    {
        let name = name.into();
        let class = std::any::type_name::<T>();
        let invoker: Invoker = Arc::new(move |instance: Instance, args: BoundArguments| {
            let instance = match instance.downcast::<T>() {
                Ok(instance) => *instance,
                Err(_) => {
                    let message = format!("instance is not a {}", class);
                    return async move { Err(Error::Internal(message)) }.boxed();
                }
            };
            let call = body(instance, args);
            async move {
                let value = call.await?;
                serde_json::to_value(value).map_err(|e| Error::Serialization(e.to_string()))
            }
            .boxed()
        });

        Self {
            registration: MethodRegistration {
                name,
                kind,
                params: Vec::new(),
                filters: Vec::new(),
                verbs: None,
                invoker,
            },
            _class: PhantomData,
        }
    }

    pub fn param(mut self, param: ParameterDescriptor) -> Self {
        self.registration.params.push(param);
        self
    }

    /// Override the process-wide verb policy for this method.
    pub fn verbs(mut self, verbs: VerbSet) -> Self {
        self.registration.verbs = Some(verbs);
        self
    }

    pub fn get_only(self) -> Self {
        self.verbs(VerbSet::only(Verb::Get))
    }

    pub fn post_only(self) -> Self {
        self.verbs(VerbSet::only(Verb::Post))
    }

    /// Append a filter. Filters run outermost first, in the order added.
    pub fn filter(mut self, filter: impl Filter + 'static) -> Self {
        self.registration.filters.push(Arc::new(filter));
        self
    }

    pub fn filter_arc(mut self, filter: Arc<dyn Filter>) -> Self {
        self.registration.filters.push(filter);
        self
    }

    pub fn into_registration(self) -> MethodRegistration {
        self.registration
    }
}

// ============================================================================
// Classes
// ============================================================================

/// Type-erased handler class: a candidate for registration.
#[derive(Clone)]
pub struct HandlerClass {
    pub name: String,
    pub type_name: &'static str,
    pub constructor: Option<Constructor>,
    pub methods: Vec<MethodRegistration>,
}

impl HandlerClass {
    /// Start describing class `T` under its routable `name`, with no constructor.
    pub fn builder<T: Send + 'static>(name: impl Into<String>) -> ClassBuilder<T> {
        ClassBuilder::new(name)
    }

    /// Start describing class `T`, using `T::default` as its constructor.
    pub fn of<T: Default + Send + 'static>(name: impl Into<String>) -> ClassBuilder<T> {
        ClassBuilder::new(name).constructor(T::default)
    }
}

impl fmt::Debug for HandlerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerClass")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("constructor", &self.constructor.is_some())
            .field("methods", &self.methods)
            .finish()
    }
}

/// Builder for [`HandlerClass`].
pub struct ClassBuilder<T> {
    name: String,
    constructor: Option<Constructor>,
    methods: Vec<MethodRegistration>,
    _class: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> ClassBuilder<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constructor: None,
            methods: Vec::new(),
            _class: PhantomData,
        }
    }

    pub fn constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.constructor = Some(Arc::new(move || Box::new(constructor()) as Instance));
        self
    }

    pub fn method(mut self, method: Method<T>) -> Self {
        self.methods.push(method.into_registration());
        self
    }

    pub fn build(self) -> HandlerClass {
        HandlerClass {
            name: self.name,
            type_name: std::any::type_name::<T>(),
            constructor: self.constructor,
            methods: self.methods,
        }
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// Immutable metadata for one routable method.
pub struct HandlerDescriptor {
    key: RoutingKey,
    type_name: &'static str,
    params: Vec<ParameterDescriptor>,
    filters: Vec<Arc<dyn Filter>>,
    verbs: Option<VerbSet>,
    constructor: Constructor,
    invoker: Invoker,
}

impl HandlerDescriptor {
    pub(crate) fn new(
        class: &HandlerClass,
        constructor: Constructor,
        method: MethodRegistration,
    ) -> Self {
        Self {
            key: RoutingKey::new(class.name.clone(), method.name),
            type_name: class.type_name,
            params: method.params,
            filters: method.filters,
            verbs: method.verbs,
            constructor,
            invoker: method.invoker,
        }
    }

    pub fn key(&self) -> &RoutingKey {
        &self.key
    }

    pub fn class_name(&self) -> &str {
        self.key.class()
    }

    pub fn method_name(&self) -> &str {
        self.key.method()
    }

    /// Rust type backing the class.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn params(&self) -> &[ParameterDescriptor] {
        &self.params
    }

    pub fn filters(&self) -> &[Arc<dyn Filter>] {
        &self.filters
    }

    /// Per-handler verb override, if any.
    pub fn verb_override(&self) -> Option<VerbSet> {
        self.verbs
    }

    /// Verbs this handler answers, given the process default.
    pub fn allowed_verbs(&self, default: VerbSet) -> VerbSet {
        self.verbs.unwrap_or(default)
    }

    /// Construct a fresh instance and run the method on it.
    ///
    /// A panic inside the method body is reported as [`Error::Panic`].
    pub fn invoke(&self, args: BoundArguments) -> BoxFuture<'static, Result<Value, Error>> {
        let constructor = self.constructor.clone();
        let invoker = self.invoker.clone();
        AssertUnwindSafe(async move {
            let instance = constructor();
            invoker(instance, args).await
        })
        .catch_unwind()
        .map(|outcome| outcome.unwrap_or_else(|panic| Err(Error::Panic(panic_message(&panic)))))
        .boxed()
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("key", &self.key)
            .field("type_name", &self.type_name)
            .field("params", &self.params)
            .field("filters", &self.filters.len())
            .field("verbs", &self.verbs)
            .finish()
    }
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
