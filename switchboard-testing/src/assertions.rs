// Test assertions for dispatched responses

use crate::TestResponse;
use switchboard_core::DispatchOutcome;

/// Assert that a response has a specific status code
pub fn assert_status(response: &TestResponse, expected: u16) {
    let actual = response.status().unwrap_or(0);
    assert_eq!(
        actual, expected,
        "Expected status {}, got {}",
        expected, actual
    );
}

/// Assert the dispatcher finished in a specific terminal state
pub fn assert_outcome(response: &TestResponse, expected: DispatchOutcome) {
    assert_eq!(
        response.outcome(),
        Some(expected),
        "Expected outcome {:?}, got {:?}",
        expected,
        response
    );
}

/// Assert that a response body contains JSON matching expected value
pub fn assert_json<T>(response: &TestResponse, expected: &T)
where
    T: serde::de::DeserializeOwned + PartialEq + std::fmt::Debug,
{
    let actual: T = match response.body_json() {
        Ok(actual) => actual,
        Err(e) => panic!("Failed to deserialize response body: {}", e),
    };
    assert_eq!(actual, *expected, "JSON bodies do not match");
}

/// Assert that a response has a specific header (name is case-insensitive)
pub fn assert_header(response: &TestResponse, key: &str, expected: &str) {
    let actual = response.header(key);
    assert_eq!(
        actual,
        Some(expected),
        "Expected header '{}' to be '{}', got {:?}",
        key,
        expected,
        actual
    );
}

/// Assert that a response body contains a string
pub fn assert_body_contains(response: &TestResponse, expected: &str) {
    let body = response.body_string().unwrap_or_default();
    assert!(
        body.contains(expected),
        "Expected body to contain '{}', but it didn't. Body: {}",
        expected,
        body
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::HttpResponse;

    fn completed(status: u16, body: &str) -> TestResponse {
        TestResponse::Completed {
            outcome: DispatchOutcome::Responded(status),
            response: HttpResponse::new(status)
                .with_header("Content-Type", "application/json")
                .with_body(body.as_bytes().to_vec()),
        }
    }

    #[test]
    fn test_assert_status() {
        assert_status(&completed(200, "1"), 200);
    }

    #[test]
    fn test_assert_header_ignores_case() {
        assert_header(&completed(200, "1"), "content-type", "application/json");
    }

    #[test]
    fn test_assert_json() {
        assert_json(&completed(200, r#"{"sum":3}"#), &serde_json::json!({"sum": 3}));
    }

    #[test]
    fn test_assert_outcome() {
        assert_outcome(&completed(403, ""), DispatchOutcome::Responded(403));
    }

    #[test]
    #[should_panic(expected = "Expected status")]
    fn test_error_has_no_status() {
        let response = TestResponse::Error(switchboard_core::Error::Internal("boom".into()));
        assert_status(&response, 500);
    }
}
