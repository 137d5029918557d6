// Test client driving the dispatcher in-process

use serde::Serialize;
use serde::de::DeserializeOwned;
use switchboard_core::{DispatchOutcome, Dispatcher, Environment, Error, HttpRequest, HttpResponse};

/// Sends requests straight through a [`Dispatcher`], no sockets involved.
#[derive(Debug, Clone)]
pub struct TestClient {
    dispatcher: Dispatcher,
}

impl TestClient {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(TestRequestBuilder::new("GET", path).build()).await
    }

    pub async fn post(&self, path: &str, body: impl Into<Vec<u8>>) -> TestResponse {
        self.send(TestRequestBuilder::new("POST", path).body(body).build())
            .await
    }

    /// POST `data` as a JSON body.
    pub async fn post_json<T: Serialize>(&self, path: &str, data: &T) -> TestResponse {
        match TestRequestBuilder::new("POST", path).json(data) {
            Ok(builder) => self.send(builder.build()).await,
            Err(error) => TestResponse::Error(error),
        }
    }

    /// Start a request with any method and headers.
    pub fn request(&self, method: &str, path: &str) -> TestRequestBuilder {
        TestRequestBuilder::new(method, path)
    }

    pub async fn send(&self, request: HttpRequest) -> TestResponse {
        let mut env = Environment::new(request);
        match self.dispatcher.dispatch(&mut env).await {
            Ok(outcome) => TestResponse::Completed {
                outcome,
                response: env.into_response(),
            },
            Err(error) => TestResponse::Error(error),
        }
    }
}

/// Builder for test requests
#[derive(Debug, Clone)]
pub struct TestRequestBuilder {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl TestRequestBuilder {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Add a header. Repeating a name sends several values.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn accept(self, media_type: &str) -> Self {
        self.header("Accept", media_type)
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn json<T: Serialize>(mut self, data: &T) -> Result<Self, Error> {
        self.body = serde_json::to_vec(data).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(self.header("Content-Type", "application/json"))
    }

    pub fn build(self) -> HttpRequest {
        let mut request = HttpRequest::new(self.method, self.path).with_body(self.body);
        for (name, value) in self.headers {
            request.add_header(&name, value);
        }
        request
    }

    /// Build and send through `client`.
    pub async fn send(self, client: &TestClient) -> TestResponse {
        client.send(self.build()).await
    }
}

/// Result of one dispatched test request.
#[derive(Debug)]
pub enum TestResponse {
    /// The dispatcher wrote a response.
    Completed {
        outcome: DispatchOutcome,
        response: HttpResponse,
    },
    /// The dispatcher handed an error back to the host.
    Error(Error),
}

impl TestResponse {
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            TestResponse::Completed { response, .. } => Some(response),
            TestResponse::Error(_) => None,
        }
    }

    pub fn outcome(&self) -> Option<DispatchOutcome> {
        match self {
            TestResponse::Completed { outcome, .. } => Some(*outcome),
            TestResponse::Error(_) => None,
        }
    }

    /// The response, panicking if the dispatcher returned an error.
    pub fn assert_completed(&self) -> &HttpResponse {
        match self {
            TestResponse::Completed { response, .. } => response,
            TestResponse::Error(error) => {
                panic!("Expected a written response, got error: {:?}", error)
            }
        }
    }

    /// The error, panicking if the dispatcher wrote a response.
    pub fn assert_error(&self) -> &Error {
        match self {
            TestResponse::Error(error) => error,
            TestResponse::Completed { response, .. } => {
                panic!("Expected an error, got status {}", response.status)
            }
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.response().map(|r| r.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.response().and_then(|r| r.header(name))
    }

    pub fn body(&self) -> &[u8] {
        self.response().map(|r| r.body.as_slice()).unwrap_or(&[])
    }

    pub fn body_string(&self) -> Option<String> {
        self.response()
            .and_then(|r| String::from_utf8(r.body.clone()).ok())
    }

    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T, String> {
        match self {
            TestResponse::Completed { response, .. } => serde_json::from_slice(&response.body)
                .map_err(|e| format!("Deserialization error: {}", e)),
            TestResponse::Error(error) => Err(format!("{:?}", error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = TestRequestBuilder::new("GET", "/Calc/Add.json?a=1")
            .header("Accept", "application/xml")
            .header("accept", "text/plain")
            .build();

        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/Calc/Add.json");
        assert_eq!(req.query("a"), Some("1"));
        assert_eq!(req.header_values("Accept").len(), 2);
    }

    #[test]
    fn test_json_body() {
        let req = TestRequestBuilder::new("POST", "/Calc/Add")
            .json(&serde_json::json!({"a": 1}))
            .unwrap()
            .build();
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.body, br#"{"a":1}"#);
    }
}
