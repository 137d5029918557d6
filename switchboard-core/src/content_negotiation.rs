//! Content negotiation.
//!
//! Picks the formatter for a response from the extension hint of the path or,
//! failing that, the `Accept` header.
//!
//! # Policy
//!
//! 1. Extension hint present: exact extension match over `[default] ++ extras`.
//!    No match is `406 Not Acceptable`.
//! 2. Otherwise, with an `Accept` header: only its first value is considered
//!    (no q-values, no wildcard expansion). The first formatter whose media type
//!    is a substring of that value wins. No match falls back to the default.
//! 3. Otherwise the default formatter.
//!
//! ```
//! use switchboard_core::content_negotiation::FormatterRegistry;
//! use switchboard_core::formatter::{JsonFormatter, XmlFormatter};
//!
//! let registry = FormatterRegistry::new(JsonFormatter::new()).with_extra(XmlFormatter::new());
//!
//! let accept = vec!["application/xml, text/html;q=0.9".to_string()];
//! assert_eq!(registry.select(None, &accept).unwrap().extension(), "xml");
//!
//! let accept = vec!["image/png".to_string()];
//! assert_eq!(registry.select(None, &accept).unwrap().extension(), "json");
//!
//! assert!(registry.select(Some("csv"), &[]).is_err());
//! ```

use crate::Error;
use crate::formatter::{Formatter, JsonFormatter};
use std::fmt;
use std::sync::Arc;

/// Ordered formatter set: one default plus extra formatters in priority order.
#[derive(Clone)]
pub struct FormatterRegistry {
    default: Arc<dyn Formatter>,
    extras: Vec<Arc<dyn Formatter>>,
}

impl FormatterRegistry {
    pub fn new(default: impl Formatter + 'static) -> Self {
        Self::from_arc(Arc::new(default))
    }

    pub fn from_arc(default: Arc<dyn Formatter>) -> Self {
        Self {
            default,
            extras: Vec::new(),
        }
    }

    pub fn with_extra(mut self, formatter: impl Formatter + 'static) -> Self {
        self.extras.push(Arc::new(formatter));
        self
    }

    pub fn push_extra(&mut self, formatter: Arc<dyn Formatter>) {
        self.extras.push(formatter);
    }

    pub fn default_formatter(&self) -> &Arc<dyn Formatter> {
        &self.default
    }

    pub fn extras(&self) -> &[Arc<dyn Formatter>] {
        &self.extras
    }

    /// Default first, then extras in configured order.
    pub fn candidates(&self) -> impl Iterator<Item = &Arc<dyn Formatter>> {
        std::iter::once(&self.default).chain(self.extras.iter())
    }

    pub fn by_extension(&self, extension: &str) -> Option<&Arc<dyn Formatter>> {
        self.candidates().find(|f| f.extension() == extension)
    }

    /// First candidate whose media-type tag occurs inside `accept`.
    pub fn by_accept(&self, accept: &str) -> Option<&Arc<dyn Formatter>> {
        self.candidates().find(|f| accept.contains(f.media_type()))
    }

    /// Select a formatter for a request.
    ///
    /// `accept_values` is the list of `Accept` header values as received; only
    /// the first one is inspected.
    pub fn select(
        &self,
        extension: Option<&str>,
        accept_values: &[String],
    ) -> Result<Arc<dyn Formatter>, Error> {
        if let Some(ext) = extension {
            return self.by_extension(ext).cloned().ok_or_else(|| {
                Error::NotAcceptable(format!("no formatter for extension '.{}'", ext))
            });
        }

        if let Some(accept) = accept_values.first() {
            if let Some(formatter) = self.by_accept(accept) {
                return Ok(formatter.clone());
            }
            tracing::debug!(accept = %accept, "Accept header unmatched, using default formatter");
        }

        Ok(self.default.clone())
    }
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::new(JsonFormatter::new())
    }
}

impl fmt::Debug for FormatterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let extras: Vec<&str> = self.extras.iter().map(|e| e.extension()).collect();
        f.debug_struct("FormatterRegistry")
            .field("default", &self.default.extension())
            .field("extras", &extras)
            .finish()
    }
}
