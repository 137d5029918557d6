//! Declarative dispatcher settings.
//!
//! ```toml
//! default_verbs = ["GET", "POST"]
//! default_formatter = "json"
//! extra_formatters = ["xml"]
//! error_policy = "include_error_details"
//! ```
//!
//! Environment overrides use the same keys under the `SWITCHBOARD_` prefix,
//! with lists written comma-separated: `SWITCHBOARD_DEFAULT_VERBS=GET`.

use crate::env::{EnvLoader, load_dotenv};
use crate::loader::{ConfigLoader, FileFormat};
use crate::validation::{ConfigValidator, Validate};
use crate::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use switchboard_core::{DispatchConfig, ErrorPolicy, FormatterCatalog, Verb};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchSettings {
    pub default_verbs: Vec<Verb>,
    pub default_formatter: String,
    pub extra_formatters: Vec<String>,
    pub error_policy: ErrorPolicy,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            default_verbs: Verb::ALL.to_vec(),
            default_formatter: "json".to_string(),
            extra_formatters: Vec::new(),
            error_policy: ErrorPolicy::default(),
        }
    }
}

impl DispatchSettings {
    /// Read a settings file, detecting its format from the name.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let loader = ConfigLoader::auto(path)?;
        let value = loader.load_file(path)?;
        Self::from_loaded(loader.format(), value)
    }

    /// Parse settings text in the given format.
    pub fn parse(format: FileFormat, content: &str) -> Result<Self> {
        let value = ConfigLoader::new(format).parse(content)?;
        Self::from_loaded(format, value)
    }

    fn from_loaded(format: FileFormat, value: Value) -> Result<Self> {
        match format {
            FileFormat::Env => {
                let pairs: HashMap<String, String> = match value {
                    Value::Object(map) => map
                        .into_iter()
                        .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
                        .collect(),
                    _ => HashMap::new(),
                };
                let mut settings = Self::default();
                settings.apply_overrides(&pairs)?;
                Ok(settings)
            }
            FileFormat::Json | FileFormat::Toml => serde_json::from_value(value)
                .map_err(|e| ConfigError::DeserializationError(e.to_string())),
        }
    }

    /// Apply string overrides keyed by setting name. Unrelated keys are ignored.
    pub fn apply_overrides(&mut self, vars: &HashMap<String, String>) -> Result<()> {
        if let Some(raw) = vars.get("default_verbs") {
            self.default_verbs = split_list(raw)
                .map(|v| v.parse::<Verb>().map_err(ConfigError::ValidationError))
                .collect::<Result<_>>()?;
        }
        if let Some(raw) = vars.get("default_formatter") {
            self.default_formatter = raw.trim().to_string();
        }
        if let Some(raw) = vars.get("extra_formatters") {
            self.extra_formatters = split_list(raw).map(str::to_string).collect();
        }
        if let Some(raw) = vars.get("error_policy") {
            self.error_policy = raw.parse().map_err(ConfigError::ValidationError)?;
        }
        Ok(())
    }

    /// Apply `SWITCHBOARD_*` variables from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(&EnvLoader::switchboard().load())
    }

    /// Defaults, then the optional file, then `.env`, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        load_dotenv(None)?;
        settings.apply_env()?;
        settings.validate()?;
        tracing::debug!(?settings, "dispatch settings loaded");
        Ok(settings)
    }

    /// Resolve formatter names against `catalog` and build the runtime config.
    pub fn into_config(self, catalog: &FormatterCatalog) -> Result<DispatchConfig> {
        self.validate()?;

        let resolve = |name: &str| {
            catalog
                .get(name)
                .ok_or_else(|| ConfigError::UnknownFormatter(name.to_string()))
        };

        let mut builder = DispatchConfig::builder()
            .default_verbs(self.default_verbs.iter().copied())
            .default_formatter_arc(resolve(&self.default_formatter)?)
            .error_policy(self.error_policy);
        for name in &self.extra_formatters {
            builder = builder.extra_formatter_arc(resolve(name)?);
        }
        Ok(builder.build())
    }
}

impl Validate for DispatchSettings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::non_empty_list(&self.default_verbs, "default_verbs")?;
        ConfigValidator::not_empty(&self.default_formatter, "default_formatter")?;
        ConfigValidator::unique(&self.extra_formatters, "extra_formatters")?;
        if self.extra_formatters.contains(&self.default_formatter) {
            return Err(ConfigError::ValidationError(format!(
                "extra_formatters repeats the default formatter '{}'",
                self.default_formatter
            )));
        }
        Ok(())
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::VerbSet;

    #[test]
    fn test_defaults_are_valid() {
        let settings = DispatchSettings::default();
        assert!(settings.validate().is_ok());
        let config = settings.into_config(&FormatterCatalog::with_builtins()).unwrap();
        assert_eq!(config.default_verbs, VerbSet::all());
        assert_eq!(config.formatters.default_formatter().extension(), "json");
    }

    #[test]
    fn test_toml_settings() {
        let settings = DispatchSettings::parse(
            FileFormat::Toml,
            r#"
            default_verbs = ["GET"]
            extra_formatters = ["xml", "txt"]
            error_policy = "rethrow"
            "#,
        )
        .unwrap();
        assert_eq!(settings.default_verbs, vec![Verb::Get]);
        assert_eq!(settings.default_formatter, "json");

        let config = settings.into_config(&FormatterCatalog::with_builtins()).unwrap();
        let order: Vec<&str> = config.formatters.candidates().map(|f| f.extension()).collect();
        assert_eq!(order, vec!["json", "xml", "txt"]);
        assert_eq!(config.error_policy, ErrorPolicy::Rethrow);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let result = DispatchSettings::parse(FileFormat::Json, r#"{"verbs": ["GET"]}"#);
        assert!(matches!(result, Err(ConfigError::DeserializationError(_))));
    }

    #[test]
    fn test_env_file_settings() {
        let settings = DispatchSettings::parse(
            FileFormat::Env,
            "DEFAULT_VERBS=post\nERROR_POLICY=include-error-details\nEXTRA_FORMATTERS=xml, txt\n",
        )
        .unwrap();
        assert_eq!(settings.default_verbs, vec![Verb::Post]);
        assert_eq!(settings.error_policy, ErrorPolicy::IncludeErrorDetails);
        assert_eq!(settings.extra_formatters, vec!["xml", "txt"]);
    }

    #[test]
    fn test_overrides_reject_bad_values() {
        let mut settings = DispatchSettings::default();
        let vars = HashMap::from([("default_verbs".to_string(), "GET,PUT".to_string())]);
        assert!(settings.apply_overrides(&vars).is_err());

        let vars = HashMap::from([("error_policy".to_string(), "shrug".to_string())]);
        assert!(settings.apply_overrides(&vars).is_err());
    }

    #[test]
    fn test_empty_verbs_rejected() {
        let settings = DispatchSettings {
            default_verbs: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(
            settings.into_config(&FormatterCatalog::with_builtins()),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_unknown_formatter_rejected() {
        let settings = DispatchSettings {
            extra_formatters: vec!["yaml".to_string()],
            ..Default::default()
        };
        match settings.into_config(&FormatterCatalog::with_builtins()) {
            Err(ConfigError::UnknownFormatter(name)) => assert_eq!(name, "yaml"),
            other => panic!("expected unknown formatter, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_duplicate_formatters_rejected() {
        let settings = DispatchSettings {
            extra_formatters: vec!["json".to_string()],
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
