// Host environment: request data, response state and per-request items

use serde_json::Value;
use std::collections::HashMap;

/// Request as handed over by the host.
///
/// Header names are stored lowercased; each name maps to every value the
/// client sent, in order.
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, Vec<String>>,
    pub query_params: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Create a request. A `?query` suffix on `path` is split off and parsed.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        let (path, query_params) = match path.split_once('?') {
            Some((path, query)) => (path.to_string(), parse_query(query)),
            None => (path, HashMap::new()),
        };

        Self {
            method: method.into(),
            path,
            headers: HashMap::new(),
            query_params,
            body: Vec::new(),
        }
    }

    /// Append a header value.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.add_header(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn add_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// First value of a header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_values(name).first().map(String::as_str)
    }

    /// Every value of a header, in the order received.
    pub fn header_values(&self, name: &str) -> &[String] {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Get a query parameter by name
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }
}

fn parse_query(query: &str) -> HashMap<String, String> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(query)
        .map(|pairs| pairs.into_iter().collect())
        .unwrap_or_default()
}

/// Mutable response state for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Append bytes to the body.
    pub fn write(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    /// Discard everything written so far and start over with `status`.
    pub fn reset(&mut self, status: u16) {
        self.status = status;
        self.headers.clear();
        self.body.clear();
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::ok()
    }
}

/// Per-request environment shared between the host and the dispatcher.
///
/// The dispatcher reads the request and writes the response; `items` carries
/// arbitrary host or filter data for the lifetime of the request.
#[derive(Debug, Default)]
pub struct Environment {
    pub request: HttpRequest,
    pub response: HttpResponse,
    items: HashMap<String, Value>,
}

impl Environment {
    pub fn new(request: HttpRequest) -> Self {
        Self {
            request,
            response: HttpResponse::ok(),
            items: HashMap::new(),
        }
    }

    pub fn item(&self, key: &str) -> Option<&Value> {
        self.items.get(key)
    }

    pub fn set_item(&mut self, key: impl Into<String>, value: Value) {
        self.items.insert(key.into(), value);
    }

    pub fn into_response(self) -> HttpResponse {
        self.response
    }
}
