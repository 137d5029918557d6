// Process-wide dispatch configuration

use crate::binder::{DefaultBinder, ParameterBinder};
use crate::content_negotiation::FormatterRegistry;
use crate::formatter::{Formatter, JsonFormatter};
use crate::verb::{Verb, VerbSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// What to answer when a binder, filter or handler fails unexpectedly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// `500` with an empty body.
    #[default]
    InternalServerErrorOnly,
    /// `500` with the error text as a `text/plain` body.
    IncludeErrorDetails,
    /// Hand the error back to the host untouched.
    Rethrow,
}

impl std::str::FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "internal_server_error_only" | "500" => Ok(ErrorPolicy::InternalServerErrorOnly),
            "include_error_details" | "details" => Ok(ErrorPolicy::IncludeErrorDetails),
            "rethrow" => Ok(ErrorPolicy::Rethrow),
            _ => Err(format!("unknown error policy '{}'", s)),
        }
    }
}

/// Read-only dispatcher configuration, built once and shared by `Arc`.
#[derive(Clone)]
pub struct DispatchConfig {
    pub default_verbs: VerbSet,
    pub formatters: FormatterRegistry,
    pub error_policy: ErrorPolicy,
    pub binder: Arc<dyn ParameterBinder>,
}

impl DispatchConfig {
    pub fn builder() -> DispatchConfigBuilder {
        DispatchConfigBuilder::default()
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_verbs: VerbSet::all(),
            formatters: FormatterRegistry::default(),
            error_policy: ErrorPolicy::default(),
            binder: Arc::new(DefaultBinder::new()),
        }
    }
}

impl fmt::Debug for DispatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchConfig")
            .field("default_verbs", &self.default_verbs)
            .field("formatters", &self.formatters)
            .field("error_policy", &self.error_policy)
            .finish_non_exhaustive()
    }
}

/// Builder for [`DispatchConfig`].
///
/// ```
/// use switchboard_core::config::{DispatchConfig, ErrorPolicy};
/// use switchboard_core::formatter::XmlFormatter;
/// use switchboard_core::verb::Verb;
///
/// let config = DispatchConfig::builder()
///     .default_verbs([Verb::Get])
///     .extra_formatter(XmlFormatter::new())
///     .error_policy(ErrorPolicy::IncludeErrorDetails)
///     .build();
///
/// assert!(!config.default_verbs.contains(Verb::Post));
/// assert_eq!(config.formatters.extras().len(), 1);
/// ```
#[derive(Default)]
pub struct DispatchConfigBuilder {
    default_verbs: Option<VerbSet>,
    default_formatter: Option<Arc<dyn Formatter>>,
    extras: Vec<Arc<dyn Formatter>>,
    error_policy: ErrorPolicy,
    binder: Option<Arc<dyn ParameterBinder>>,
}

impl DispatchConfigBuilder {
    pub fn default_verbs(mut self, verbs: impl IntoIterator<Item = Verb>) -> Self {
        self.default_verbs = Some(verbs.into_iter().collect());
        self
    }

    pub fn verb_set(mut self, verbs: VerbSet) -> Self {
        self.default_verbs = Some(verbs);
        self
    }

    pub fn default_formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.default_formatter = Some(Arc::new(formatter));
        self
    }

    pub fn default_formatter_arc(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.default_formatter = Some(formatter);
        self
    }

    pub fn extra_formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.extras.push(Arc::new(formatter));
        self
    }

    pub fn extra_formatter_arc(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.extras.push(formatter);
        self
    }

    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    pub fn binder(mut self, binder: impl ParameterBinder + 'static) -> Self {
        self.binder = Some(Arc::new(binder));
        self
    }

    pub fn build(self) -> DispatchConfig {
        let default = self
            .default_formatter
            .unwrap_or_else(|| Arc::new(JsonFormatter::new()));
        let mut formatters = FormatterRegistry::from_arc(default);
        for extra in self.extras {
            formatters.push_extra(extra);
        }

        DispatchConfig {
            default_verbs: self.default_verbs.unwrap_or_default(),
            formatters,
            error_policy: self.error_policy,
            binder: self
                .binder
                .unwrap_or_else(|| Arc::new(DefaultBinder::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::{PlainTextFormatter, XmlFormatter};

    #[test]
    fn test_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.default_verbs, VerbSet::all());
        assert_eq!(config.error_policy, ErrorPolicy::InternalServerErrorOnly);
        assert_eq!(config.formatters.default_formatter().extension(), "json");
        assert!(config.formatters.extras().is_empty());
    }

    #[test]
    fn test_builder_order_is_kept() {
        let config = DispatchConfig::builder()
            .default_formatter(XmlFormatter::new())
            .extra_formatter(PlainTextFormatter)
            .extra_formatter(JsonFormatter::new())
            .build();
        let order: Vec<&str> = config.formatters.candidates().map(|f| f.extension()).collect();
        assert_eq!(order, vec!["xml", "txt", "json"]);
    }

    #[test]
    fn test_error_policy_parsing() {
        assert_eq!("rethrow".parse::<ErrorPolicy>(), Ok(ErrorPolicy::Rethrow));
        assert_eq!(
            "Include-Error-Details".parse::<ErrorPolicy>(),
            Ok(ErrorPolicy::IncludeErrorDetails)
        );
        assert!("explode".parse::<ErrorPolicy>().is_err());

        let policy: ErrorPolicy = serde_json::from_str(r#""include_error_details""#).unwrap();
        assert_eq!(policy, ErrorPolicy::IncludeErrorDetails);
    }
}
