// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;
use std::path::Path;

/// Prefix of every dispatcher environment variable.
pub const ENV_PREFIX: &str = "SWITCHBOARD";

/// Reads `PREFIX_KEY` variables into a map keyed by lowercased `key`.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Loader for the `SWITCHBOARD_` namespace.
    pub fn switchboard() -> Self {
        Self::new(Some(ENV_PREFIX.to_string()))
    }

    /// Load from the process environment.
    pub fn load(&self) -> HashMap<String, String> {
        self.load_from(env::vars())
    }

    /// Load from any list of variables.
    pub fn load_from<I, K, V>(&self, vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        vars.into_iter()
            .filter_map(|(key, value)| {
                let key = key.as_ref();
                let name = match &self.prefix {
                    Some(prefix) => key.strip_prefix(prefix.as_str())?.strip_prefix('_')?,
                    None => key,
                };
                Some((name.to_lowercase(), value.into()))
            })
            .collect()
    }

    /// Read a single variable.
    pub fn load_var(&self, key: &str) -> Result<String> {
        env::var(self.full_key(key)).map_err(ConfigError::EnvError)
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::switchboard()
    }
}

/// Load a `.env` file into the process environment. Variables already set win.
///
/// With no path, looks for `.env` in the current directory and its parents;
/// a missing file is not an error in that case.
pub fn load_dotenv(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => dotenvy::from_path(path)
            .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.display(), e))),
        None => match dotenvy::dotenv() {
            Ok(_) => Ok(()),
            Err(e) if e.not_found() => Ok(()),
            Err(e) => Err(ConfigError::LoadError(e.to_string())),
        },
    }
}
