//! Integration tests for common Switchboard workflows.
//!
//! Each test builds a small registry, dispatches requests through it and
//! checks what the client would see.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use switchboard::prelude::*;
use switchboard::{
    FnFilter, FormatterCatalog, LoggingFilter, Registration,
    RegistrationError, RegistryState, RoutingKey, XmlFormatter,
};
use switchboard_testing::*;

// =============================================================================
// Fixtures
// =============================================================================

#[derive(Default)]
struct Calculator;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Sum {
    total: i64,
}

fn calculator() -> HandlerClass {
    HandlerClass::of::<Calculator>("Calculator")
        .method(
            Method::new("Add", |_: Calculator, args: BoundArguments| async move {
                Ok(Sum {
                    total: args.take::<i64>("a")? + args.take::<i64>("b")?,
                })
            })
            .param(ParameterDescriptor::query("a", ParamType::Integer))
            .param(ParameterDescriptor::query("b", ParamType::Integer))
            .get_only(),
        )
        .method(
            Method::new("Reset", |_: Calculator, _| async { Ok(0) }).post_only(),
        )
        .method(Method::accessor("Precision", |_: Calculator, _| async { Ok(2) }))
        .build()
}

#[derive(Default)]
struct Vault;

fn vault() -> HandlerClass {
    HandlerClass::of::<Vault>("Vault")
        .method(Method::new("Open", |_: Vault, _| async {
            Err::<(), _>(Error::status_with_body(403, "vault is sealed"))
        }))
        .method(Method::new("Explode", |_: Vault, _| async {
            Err::<(), _>(Error::handler("combination lock jammed"))
        }))
        .build()
}

fn app_with(config: DispatchConfig) -> TestApp {
    TestAppBuilder::new()
        .class(calculator())
        .class(vault())
        .config(config)
        .build()
}

fn app() -> TestApp {
    app_with(DispatchConfig::default())
}

// =============================================================================
// Registration
// =============================================================================

#[test]
fn test_one_entry_per_class_method() {
    let app = app();
    let registry = app.registry();
    assert_eq!(registry.state(), RegistryState::Sealed);

    let keys: Vec<String> = registry.keys().iter().map(ToString::to_string).collect();
    assert_eq!(
        keys,
        vec![
            "Calculator/Add",
            "Calculator/Reset",
            "Vault/Explode",
            "Vault/Open"
        ]
    );

    let add = registry.lookup(&RoutingKey::new("Calculator", "Add")).unwrap();
    assert_eq!(add.class_name(), "Calculator");
    assert_eq!(add.method_name(), "Add");
    assert!(registry.lookup(&RoutingKey::new("Calculator", "Precision")).is_none());
}

#[test]
fn test_missing_constructor_fails_whole_batch() {
    struct NoDefault;

    let orphan = HandlerClass::builder::<NoDefault>("Orphan")
        .method(Method::new("Adopt", |_: NoDefault, _| async { Ok(()) }))
        .build();

    let registry = HandlerRegistry::new();
    let err = registry.register(vec![calculator(), orphan]).unwrap_err();
    assert!(matches!(err, RegistrationError::MissingConstructor { ref class } if class == "Orphan"));
    assert_eq!(registry.state(), RegistryState::Failed);
    assert!(registry.lookup(&RoutingKey::new("Calculator", "Add")).is_none());
}

#[test]
fn test_second_registration_has_no_effect() {
    let registry = HandlerRegistry::new();
    assert!(matches!(
        registry.register(vec![calculator()]).unwrap(),
        Registration::Sealed { handlers: 2 }
    ));
    assert_eq!(
        registry.register(vec![vault()]).unwrap(),
        Registration::AlreadyRegistered
    );
    assert_eq!(registry.len(), 2);
    assert!(registry.lookup(&RoutingKey::new("Vault", "Open")).is_none());
}

#[derive(Default)]
struct Inventory;

fn inventory_handlers() -> HandlerClass {
    HandlerClass::of::<Inventory>("Inventory")
        .method(Method::new("Count", |_: Inventory, _| async { Ok(42) }))
        .build()
}

switchboard::submit_handler!(inventory_handlers);

#[tokio::test]
async fn test_manifest_registration() {
    let registry = Arc::new(HandlerRegistry::new());
    registry.register_manifest().unwrap();
    assert!(registry.lookup(&RoutingKey::new("Inventory", "Count")).is_some());

    let client = TestClient::new(Dispatcher::new(registry, Arc::new(DispatchConfig::default())));
    let response = client.get("/Inventory/Count").await;
    assert_status(&response, 200);
    assert_json(&response, &42);
}

// =============================================================================
// Routing
// =============================================================================

#[tokio::test]
async fn test_get_reaches_handler() {
    let response = app().client().get("/Calculator/Add?a=2&b=3").await;
    assert_outcome(&response, DispatchOutcome::Responded(200));
    assert_header(&response, "Content-Type", "application/json");
    assert_json(&response, &Sum { total: 5 });
}

#[tokio::test]
async fn test_verb_policy() {
    let client = app().client();

    let response = client.get("/Calculator/Reset").await;
    assert_outcome(&response, DispatchOutcome::Rejected(405));

    let response = client.post("/Calculator/Reset", Vec::new()).await;
    assert_status(&response, 200);

    let response = client.request("PUT", "/Calculator/Add?a=1&b=1").send(&client).await;
    assert_status(&response, 405);
}

#[tokio::test]
async fn test_unknown_routes_are_404() {
    let client = app().client();
    for path in [
        "/Calculator/Subtract",
        "/Nobody/Add",
        "/Calculator",
        "/Calculator/Add/Extra",
        "/Calculator/Precision",
    ] {
        let response = client.get(path).await;
        assert_status(&response, 404);
    }
}

#[tokio::test]
async fn test_trailing_slash_is_ignored() {
    let response = app().client().get("/Calculator/Add/?a=1&b=1").await;
    assert_json(&response, &Sum { total: 2 });
}

// =============================================================================
// Content negotiation
// =============================================================================

#[tokio::test]
async fn test_extension_selects_configured_formatter() {
    let config = DispatchConfig::builder()
        .extra_formatter(XmlFormatter::with_root("Sum"))
        .build();
    let response = app_with(config)
        .client()
        .get("/Calculator/Add.xml?a=1&b=2")
        .await;
    assert_status(&response, 200);
    assert_header(&response, "Content-Type", "application/xml");
    assert_body_contains(&response, "<total>3</total>");
}

#[tokio::test]
async fn test_unconfigured_extension_is_406() {
    let response = app().client().get("/Calculator/Add.xml?a=1&b=2").await;
    assert_outcome(&response, DispatchOutcome::Rejected(406));
}

#[tokio::test]
async fn test_accept_header_never_406() {
    let config = DispatchConfig::builder()
        .default_formatter_arc(FormatterCatalog::with_builtins().get("txt").unwrap())
        .extra_formatter(switchboard::JsonFormatter::new())
        .build();
    let client = app_with(config).client();

    let response = client
        .request("GET", "/Calculator/Add?a=1&b=2")
        .accept("application/json")
        .send(&client)
        .await;
    assert_header(&response, "Content-Type", "application/json");

    let response = client
        .request("GET", "/Calculator/Add?a=1&b=2")
        .accept("application/xml")
        .send(&client)
        .await;
    assert_status(&response, 200);
    assert_header(&response, "Content-Type", "text/plain");
    assert_eq!(response.body_string().unwrap(), r#"{"total":3}"#);
}

// =============================================================================
// Execution and error policy
// =============================================================================

#[tokio::test]
async fn test_status_signal_is_written_verbatim() {
    let response = app().client().get("/Vault/Open").await;
    assert_outcome(&response, DispatchOutcome::Responded(403));
    assert_eq!(response.body(), b"vault is sealed");
}

#[tokio::test]
async fn test_fault_without_details() {
    let response = app().client().get("/Vault/Explode").await;
    assert_outcome(&response, DispatchOutcome::Faulted(500));
    assert!(response.body().is_empty());
}

#[tokio::test]
async fn test_fault_with_details() {
    let config = DispatchConfig::builder()
        .error_policy(ErrorPolicy::IncludeErrorDetails)
        .build();
    let response = app_with(config).client().get("/Vault/Explode").await;
    assert_status(&response, 500);
    assert_header(&response, "Content-Type", "text/plain");
    assert_body_contains(&response, "combination lock jammed");
}

#[tokio::test]
async fn test_fault_rethrown_to_host() {
    let config = DispatchConfig::builder()
        .error_policy(ErrorPolicy::Rethrow)
        .build();
    let response = app_with(config).client().get("/Vault/Explode").await;
    assert!(matches!(response.assert_error(), Error::Handler(_)));
}

#[tokio::test]
async fn test_binder_rejection_is_400() {
    let response = app().client().get("/Calculator/Add?a=1&b=two").await;
    assert_outcome(&response, DispatchOutcome::BinderFailed(400));
    assert_header(&response, "Content-Type", "text/plain");
}

#[tokio::test]
async fn test_filters_guard_and_observe() {
    #[derive(Default)]
    struct Admin;

    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let admin = HandlerClass::of::<Admin>("Admin")
        .method(
            Method::new("Stats", move |_: Admin, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(json!({"uptime": 1})) }
            })
            .filter(LoggingFilter)
            .filter(FnFilter::new("token", |ctx: &mut RequestContext<'_>| {
                match ctx.request().header("x-token") {
                    Some("letmein") => Ok(()),
                    _ => Err(Error::status(401)),
                }
            })),
        )
        .build();
    let client = TestAppBuilder::new().class(admin).build().client();

    let response = client.get("/Admin/Stats").await;
    assert_status(&response, 401);
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    let response = client
        .request("GET", "/Admin/Stats")
        .header("X-Token", "letmein")
        .send(&client)
        .await;
    assert_status(&response, 200);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_body_parameters_on_post() {
    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Order {
        item: String,
        qty: u32,
    }

    #[derive(Default)]
    struct Shop;

    let shop = HandlerClass::of::<Shop>("Shop")
        .method(
            Method::new("Place", |_: Shop, args: BoundArguments| async move {
                let order: Order = args.take("order")?;
                Ok(json!({"accepted": order.qty, "item": order.item}))
            })
            .param(ParameterDescriptor::body("order"))
            .post_only(),
        )
        .build();
    let client = TestAppBuilder::new().class(shop).build().client();

    let response = client
        .post_json(
            "/Shop/Place",
            &Order {
                item: "lamp".into(),
                qty: 2,
            },
        )
        .await;
    assert_status(&response, 200);
    assert_json(&response, &json!({"accepted": 2, "item": "lamp"}));
}
