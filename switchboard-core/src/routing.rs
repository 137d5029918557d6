//! Routing of request paths to handler descriptors.
//!
//! Paths have exactly two segments, `/{Class}/{Method}`, with an optional
//! extension hint on the method segment (`/{Class}/{Method}.{ext}`). The
//! extension never takes part in the lookup; it only steers content
//! negotiation.
//!
//! The router checks, in order:
//!
//! 1. the request verb is GET or POST, else `405`,
//! 2. the path has exactly two non-empty segments, else `404`,
//! 3. a handler is registered under `Class/Method`, else `404`,
//! 4. the handler accepts the verb, else `405`.

use crate::Error;
use crate::handler::HandlerDescriptor;
use crate::route_registry::HandlerRegistry;
use crate::verb::{Verb, VerbSet};
use std::fmt;
use std::sync::Arc;

/// `(class name, method name)` pair identifying a handler. Case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutingKey {
    class: String,
    method: String,
}

impl RoutingKey {
    pub fn new(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            method: method.into(),
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn method(&self) -> &str {
        &self.method
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.class, self.method)
    }
}

/// Result of splitting a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub key: RoutingKey,
    pub extension: Option<String>,
}

/// Split a path into its routing key and extension hint.
///
/// Leading and trailing slashes are ignored. Returns `None` unless what is
/// left has exactly two non-empty segments. The
/// extension is everything after the last `.` of the method segment; a
/// trailing `.` with nothing after it is not a hint and stays part of the
/// method name.
///
/// ```
/// use switchboard_core::routing::{parse_path, RoutingKey};
///
/// let parsed = parse_path("/Orders/List.xml").unwrap();
/// assert_eq!(parsed.key, RoutingKey::new("Orders", "List"));
/// assert_eq!(parsed.extension.as_deref(), Some("xml"));
///
/// assert!(parse_path("/Orders").is_none());
/// assert!(parse_path("/Orders/List/Extra").is_none());
/// ```
pub fn parse_path(path: &str) -> Option<ParsedPath> {
    let path = path.split('?').next().unwrap_or_default();
    let trimmed = path.trim_matches('/');

    let mut segments = trimmed.split('/');
    let class = segments.next()?;
    let method = segments.next()?;
    if segments.next().is_some() || class.is_empty() || method.is_empty() {
        return None;
    }

    let (method, extension) = match method.rsplit_once('.') {
        Some((name, ext)) if !name.is_empty() && !ext.is_empty() => {
            (name, Some(ext.to_string()))
        }
        _ => (method, None),
    };

    Some(ParsedPath {
        key: RoutingKey::new(class, method),
        extension,
    })
}

/// A resolved route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub key: RoutingKey,
    pub verb: Verb,
    pub extension: Option<String>,
    pub descriptor: Arc<HandlerDescriptor>,
}

/// Resolves `(path, method)` pairs against a sealed registry.
#[derive(Debug, Clone)]
pub struct Router {
    registry: Arc<HandlerRegistry>,
    default_verbs: VerbSet,
}

impl Router {
    pub fn new(registry: Arc<HandlerRegistry>, default_verbs: VerbSet) -> Self {
        Self {
            registry,
            default_verbs,
        }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn default_verbs(&self) -> VerbSet {
        self.default_verbs
    }

    pub fn route(&self, path: &str, method: &str) -> Result<RouteMatch, Error> {
        let verb = Verb::parse(method)
            .ok_or_else(|| Error::MethodNotAllowed(format!("method {} is not supported", method)))?;

        let ParsedPath { key, extension } = parse_path(path)
            .ok_or_else(|| Error::NotFound(format!("no route for {}", path)))?;

        let descriptor = self
            .registry
            .lookup(&key)
            .ok_or_else(|| Error::NotFound(format!("no handler for {}", key)))?;

        let allowed = descriptor.allowed_verbs(self.default_verbs);
        if !allowed.contains(verb) {
            return Err(Error::MethodNotAllowed(format!(
                "{} accepts {}, not {}",
                key, allowed, verb
            )));
        }

        Ok(RouteMatch {
            key,
            verb,
            extension,
            descriptor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{HandlerClass, Method};

    #[derive(Default)]
    struct Orders;

    fn router(default_verbs: VerbSet) -> Router {
        let registry = HandlerRegistry::new();
        registry
            .register(vec![
                HandlerClass::of::<Orders>("Orders")
                    .method(Method::new("List", |_: Orders, _| async move { Ok(vec![1, 2]) }))
                    .method(
                        Method::new("Create", |_: Orders, _| async move { Ok(true) }).post_only(),
                    )
                    .build(),
            ])
            .unwrap();
        Router::new(Arc::new(registry), default_verbs)
    }

    #[test]
    fn test_parse_path_shapes() {
        assert_eq!(
            parse_path("/A/B").unwrap().key,
            RoutingKey::new("A", "B")
        );
        assert_eq!(parse_path("A/B").unwrap().key, RoutingKey::new("A", "B"));
        assert!(parse_path("/").is_none());
        assert!(parse_path("").is_none());
        assert!(parse_path("/A/").is_none());
        assert!(parse_path("//B").is_none());
        assert_eq!(parse_path("/A/B/").unwrap().key, RoutingKey::new("A", "B"));
    }

    #[test]
    fn test_parse_path_extension() {
        let parsed = parse_path("/A/B.tar.gz").unwrap();
        assert_eq!(parsed.key.method(), "B.tar");
        assert_eq!(parsed.extension.as_deref(), Some("gz"));

        let parsed = parse_path("/A/B.").unwrap();
        assert_eq!(parsed.key.method(), "B.");
        assert!(parsed.extension.is_none());
    }

    #[test]
    fn test_routing_key_display() {
        assert_eq!(RoutingKey::new("Orders", "List").to_string(), "Orders/List");
    }

    #[test]
    fn test_route_hit() {
        let m = router(VerbSet::all()).route("/Orders/List.xml", "GET").unwrap();
        assert_eq!(m.key, RoutingKey::new("Orders", "List"));
        assert_eq!(m.verb, Verb::Get);
        assert_eq!(m.extension.as_deref(), Some("xml"));
    }

    #[test]
    fn test_unsupported_method_before_path() {
        let err = router(VerbSet::all()).route("/not/even/close", "PUT").unwrap_err();
        assert_eq!(err.status_code(), 405);
    }

    #[test]
    fn test_method_token_is_case_sensitive() {
        let r = router(VerbSet::all());
        assert_eq!(r.route("/Orders/List", "get").unwrap_err().status_code(), 405);
        assert_eq!(r.route("/Orders/List", "Post").unwrap_err().status_code(), 405);
    }

    #[test]
    fn test_unknown_route_is_not_found() {
        let r = router(VerbSet::all());
        assert_eq!(r.route("/Orders/Missing", "GET").unwrap_err().status_code(), 404);
        assert_eq!(r.route("/Orders", "GET").unwrap_err().status_code(), 404);
        assert_eq!(r.route("/orders/list", "GET").unwrap_err().status_code(), 404);
    }

    #[test]
    fn test_verb_gate() {
        let r = router(VerbSet::only(Verb::Get));
        assert!(r.route("/Orders/List", "GET").is_ok());
        assert_eq!(r.route("/Orders/List", "POST").unwrap_err().status_code(), 405);
        assert!(r.route("/Orders/Create", "POST").is_ok());
        assert_eq!(r.route("/Orders/Create", "GET").unwrap_err().status_code(), 405);
    }
}
