// Error types for the Switchboard dispatcher

use crate::routing::RoutingKey;
use thiserror::Error;

/// Per-request error.
///
/// Routing and negotiation rejections, explicit status signals and unhandled
/// faults all travel as this type; [`Error::status_code`] gives the HTTP status
/// each one is answered with.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Method Not Allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Not Acceptable: {0}")]
    NotAcceptable(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Unsupported Media Type: {0}")]
    UnsupportedMediaType(String),

    /// Raised by a handler or filter to answer with this exact status and body.
    #[error("Status {code}")]
    Status { code: u16, body: Vec<u8> },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Handler panicked: {0}")]
    Panic(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Explicit status signal with an empty body.
    pub fn status(code: u16) -> Self {
        Error::Status {
            code,
            body: Vec::new(),
        }
    }

    /// Explicit status signal with a body written verbatim.
    pub fn status_with_body(code: u16, body: impl Into<Vec<u8>>) -> Self {
        Error::Status {
            code,
            body: body.into(),
        }
    }

    /// Wrap any displayable failure as a handler fault.
    pub fn handler(err: impl std::fmt::Display) -> Self {
        Error::Handler(err.to_string())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            Error::MethodNotAllowed(_) => 405,
            Error::NotAcceptable(_) => 406,
            Error::BadRequest(_) | Error::Deserialization(_) => 400,
            Error::UnsupportedMediaType(_) => 415,
            Error::Status { code, .. } => *code,
            _ => 500,
        }
    }

    /// True for a handler/filter-raised status signal.
    pub fn is_status_signal(&self) -> bool {
        matches!(self, Error::Status { .. })
    }

    /// True for routing and negotiation rejections (404, 405, 406).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::MethodNotAllowed(_) | Error::NotAcceptable(_)
        )
    }
}

/// Fatal error raised while building the handler table.
///
/// Any of these aborts the whole registration pass; nothing is served from a
/// registry that failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("handler class '{class}' has no zero-argument constructor")]
    MissingConstructor { class: String },

    #[error("duplicate route '{key}' declared by '{first}' and '{second}'")]
    DuplicateRoute {
        key: RoutingKey,
        first: String,
        second: String,
    },

    #[error("discovery of handler class '{class}' panicked")]
    DiscoveryPanicked { class: String },
}
