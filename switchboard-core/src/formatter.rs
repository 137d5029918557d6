//! Content formatters.
//!
//! A formatter renders a handler's return value for one representation and is
//! addressed two ways during negotiation: by its file-extension tag
//! (`/Orders/List.xml`) and by its media-type tag (`Accept: application/xml`).
//!
//! Handler return values are carried as [`serde_json::Value`], so every
//! formatter works from the same dynamic tree.

use crate::Error;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A serializer bound to an extension tag and a media-type tag.
pub trait Formatter: Send + Sync + fmt::Debug {
    /// Extension tag without the leading dot, e.g. `json`.
    fn extension(&self) -> &str;

    /// Media-type tag, e.g. `application/json`.
    fn media_type(&self) -> &str;

    /// Render a return value.
    fn serialize(&self, value: &Value) -> Result<Vec<u8>, Error>;

    /// Whether [`Formatter::deserialize`] is supported.
    fn can_read(&self) -> bool {
        false
    }

    /// Parse a request body.
    fn deserialize(&self, _body: &[u8]) -> Result<Value, Error> {
        Err(Error::UnsupportedMediaType(format!(
            "{} bodies cannot be read",
            self.media_type()
        )))
    }
}

/// `application/json`
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Formatter for JsonFormatter {
    fn extension(&self) -> &str {
        "json"
    }

    fn media_type(&self) -> &str {
        "application/json"
    }

    fn serialize(&self, value: &Value) -> Result<Vec<u8>, Error> {
        let result = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        result.map_err(|e| Error::Serialization(e.to_string()))
    }

    fn can_read(&self) -> bool {
        true
    }

    fn deserialize(&self, body: &[u8]) -> Result<Value, Error> {
        serde_json::from_slice(body).map_err(|e| Error::Deserialization(e.to_string()))
    }
}

/// `application/xml`, write-only. Values are nested under a single root element.
#[derive(Debug, Clone)]
pub struct XmlFormatter {
    root: String,
}

impl XmlFormatter {
    pub fn new() -> Self {
        Self::with_root("Response")
    }

    pub fn with_root(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for XmlFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for XmlFormatter {
    fn extension(&self) -> &str {
        "xml"
    }

    fn media_type(&self) -> &str {
        "application/xml"
    }

    fn serialize(&self, value: &Value) -> Result<Vec<u8>, Error> {
        quick_xml::se::to_string_with_root(&self.root, value)
            .map(String::into_bytes)
            .map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// `text/plain`. Strings are written bare, everything else as compact JSON.
#[derive(Debug, Clone, Default)]
pub struct PlainTextFormatter;

impl Formatter for PlainTextFormatter {
    fn extension(&self) -> &str {
        "txt"
    }

    fn media_type(&self) -> &str {
        "text/plain"
    }

    fn serialize(&self, value: &Value) -> Result<Vec<u8>, Error> {
        Ok(match value {
            Value::String(s) => s.clone().into_bytes(),
            Value::Null => Vec::new(),
            other => other.to_string().into_bytes(),
        })
    }

    fn can_read(&self) -> bool {
        true
    }

    fn deserialize(&self, body: &[u8]) -> Result<Value, Error> {
        String::from_utf8(body.to_vec())
            .map(Value::String)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

/// Formatters known by name, used to resolve configuration entries.
#[derive(Debug, Clone, Default)]
pub struct FormatterCatalog {
    formatters: HashMap<String, Arc<dyn Formatter>>,
}

impl FormatterCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding `json`, `xml` and `txt`.
    pub fn with_builtins() -> Self {
        Self::new()
            .with(JsonFormatter::new())
            .with(XmlFormatter::new())
            .with(PlainTextFormatter)
    }

    /// Add a formatter under its extension tag, replacing any previous one.
    pub fn with(mut self, formatter: impl Formatter + 'static) -> Self {
        self.register(Arc::new(formatter));
        self
    }

    pub fn register(&mut self, formatter: Arc<dyn Formatter>) {
        self.formatters
            .insert(formatter.extension().to_string(), formatter);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Formatter>> {
        self.formatters.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.formatters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
