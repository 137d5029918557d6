//! Testing utilities for Switchboard.
//!
//! - **TestApp** - registers handler classes and builds a dispatcher
//! - **TestClient** - sends requests through the dispatcher in-process
//! - **MockHandler** - handler classes that record their calls
//! - **FilterJournal** - filters that record the order they ran in
//! - **Assertions** - status, header, JSON and outcome checks
//!
//! ## Quick Start
//!
//! ```
//! use switchboard_testing::*;
//!
//! # tokio_test::block_on(async {
//! let mock = MockHandler::new().returning("Ping", "pong");
//! let app = TestAppBuilder::new()
//!     .class(mock.class("Health", &["Ping"]))
//!     .build();
//!
//! let response = app.client().get("/Health/Ping").await;
//! assert_status(&response, 200);
//! assert_json(&response, &"pong".to_string());
//! assert!(mock.was_called("Ping"));
//! # });
//! ```

mod assertions;
mod mock;
mod test_app;
mod test_client;

pub use assertions::{
    assert_body_contains, assert_header, assert_json, assert_outcome, assert_status,
};
pub use mock::{FilterJournal, MockHandler, MockInstance, RecordingFilter};
pub use test_app::{TestApp, TestAppBuilder};
pub use test_client::{TestClient, TestRequestBuilder, TestResponse};

// Re-export common testing utilities
pub use tokio::test as tokio_test;

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::{DispatchOutcome, ParamType, ParameterDescriptor};

    #[tokio::test]
    async fn test_filters_wrap_in_order() {
        let journal = FilterJournal::new();
        let mock = MockHandler::new();
        let class = switchboard_core::HandlerClass::of::<MockInstance>("Audit")
            .method(
                mock.method("Run")
                    .filter(journal.filter("outer"))
                    .filter(journal.filter("inner")),
            )
            .build();
        let app = TestAppBuilder::new().class(class).build();

        let response = app.client().get("/Audit/Run").await;
        assert_outcome(&response, DispatchOutcome::Responded(200));
        assert_eq!(
            journal.entries(),
            vec!["outer:before", "inner:before", "inner:after", "outer:after"]
        );
    }

    #[tokio::test]
    async fn test_mock_records_bound_arguments() {
        let mock = MockHandler::new();
        let app = TestAppBuilder::new()
            .class(mock.class_with_params(
                "Calc",
                "Square",
                vec![ParameterDescriptor::query("n", ParamType::Integer)],
            ))
            .build();

        let response = app.client().get("/Calc/Square?n=7").await;
        assert_status(&response, 200);
        let args = mock.last_arguments("Square").unwrap();
        assert_eq!(args.take::<i64>("n").unwrap(), 7);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = TestAppBuilder::new().build();
        let response = app.client().get("/Nobody/Home").await;
        assert_outcome(&response, DispatchOutcome::Rejected(404));
    }
}
