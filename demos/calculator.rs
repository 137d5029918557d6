//! Calculator service.
//!
//! ```text
//! cargo run --example calculator
//! curl 'http://127.0.0.1:3000/Calculator/Add?a=2&b=3'
//! curl 'http://127.0.0.1:3000/Calculator/Add.xml?a=2&b=3'
//! curl -X POST -d '{"values":[1,2,3]}' http://127.0.0.1:3000/Calculator/Sum
//! curl 'http://127.0.0.1:3000/Calculator/Divide?a=1&b=0'
//! ```
//!
//! Settings are read from `switchboard.toml` if present and from
//! `SWITCHBOARD_*` variables, e.g. `SWITCHBOARD_ERROR_POLICY=include_error_details`.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use switchboard::prelude::*;
use switchboard::{FormatterCatalog, HeaderFilter, LoggingFilter};
use switchboard_config::DispatchSettings;
use tracing_subscriber::EnvFilter;

#[derive(Default)]
struct Calculator;

#[derive(Deserialize)]
struct Values {
    values: Vec<f64>,
}

impl Calculator {
    async fn add(self, args: BoundArguments) -> Result<i64, Error> {
        Ok(args.take::<i64>("a")? + args.take::<i64>("b")?)
    }

    async fn divide(self, args: BoundArguments) -> Result<f64, Error> {
        let a: f64 = args.take("a")?;
        let b: f64 = args.take("b")?;
        if b == 0.0 {
            return Err(Error::status_with_body(422, "division by zero"));
        }
        Ok(a / b)
    }

    async fn sum(self, args: BoundArguments) -> Result<f64, Error> {
        let body: Values = args.take("body")?;
        Ok(body.values.iter().sum())
    }
}

fn calculator() -> HandlerClass {
    HandlerClass::of::<Calculator>("Calculator")
        .method(
            Method::new("Add", Calculator::add)
                .param(ParameterDescriptor::query("a", ParamType::Integer))
                .param(ParameterDescriptor::query("b", ParamType::Integer))
                .filter(LoggingFilter),
        )
        .method(
            Method::new("Divide", Calculator::divide)
                .param(ParameterDescriptor::query("a", ParamType::Float))
                .param(ParameterDescriptor::query("b", ParamType::Float))
                .get_only(),
        )
        .method(
            Method::new("Sum", Calculator::sum)
                .param(ParameterDescriptor::body("body"))
                .post_only()
                .filter(HeaderFilter::new("Cache-Control", "no-store")),
        )
        .build()
}

switchboard::submit_handler!(calculator);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings_path = Path::new("switchboard.toml");
    let settings =
        DispatchSettings::load(settings_path.exists().then_some(settings_path))?;
    let config = settings.into_config(&FormatterCatalog::with_builtins())?;

    let registry = Arc::new(HandlerRegistry::new());
    registry.register_manifest()?;
    tracing::info!(handlers = registry.len(), "registry sealed");

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    println!("Calculator listening on http://{}", addr);
    println!("  GET  /Calculator/Add?a=2&b=3");
    println!("  GET  /Calculator/Add.xml?a=2&b=3");
    println!("  GET  /Calculator/Divide?a=1&b=4");
    println!("  POST /Calculator/Sum  {{\"values\":[1,2,3]}}");

    Application::new(registry, config)
        .listen_with_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
