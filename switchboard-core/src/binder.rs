//! Parameter binding.
//!
//! A [`ParameterBinder`] turns the request held in the [`Environment`] into
//! the [`BoundArguments`] of a handler method. Returning `Ok(None)` means the
//! binder has already written a response (usually `400 Bad Request`) and the
//! dispatcher must stop.

use crate::config::DispatchConfig;
use crate::formatter::{Formatter, JsonFormatter};
use crate::handler::{BoundArguments, ParamSource, ParamType, ParameterDescriptor};
use crate::http::Environment;
use crate::Error;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait ParameterBinder: Send + Sync {
    async fn bind(
        &self,
        env: &mut Environment,
        config: &DispatchConfig,
        params: &[ParameterDescriptor],
    ) -> Result<Option<BoundArguments>, Error>;
}

/// Binds from the query string, headers and a JSON request body.
///
/// | source   | lookup                                                        |
/// |----------|---------------------------------------------------------------|
/// | `Query`  | query parameter of the same name                              |
/// | `Header` | first value of the header of the same name                    |
/// | `Body`   | the whole body, parsed as JSON                                |
/// | `Any`    | query parameter, then a field of a JSON object body, then header |
///
/// Textual values are coerced to the declared [`ParamType`]. A required
/// parameter that is missing or fails coercion produces a `400` response with
/// a `text/plain` explanation.
#[derive(Debug, Clone, Default)]
pub struct DefaultBinder {
    json: JsonFormatter,
}

impl DefaultBinder {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_body(&self, env: &Environment) -> Result<Option<Value>, Error> {
        if env.request.body.is_empty() {
            return Ok(None);
        }
        self.json.deserialize(&env.request.body).map(Some)
    }

    fn resolve(
        &self,
        env: &Environment,
        body: &mut Option<Result<Option<Value>, Error>>,
        param: &ParameterDescriptor,
    ) -> Result<Option<Value>, Error> {
        match param.source {
            ParamSource::Query => env
                .request
                .query(&param.name)
                .map(|raw| coerce_text(&param.name, raw, param.ty))
                .transpose(),
            ParamSource::Header => env
                .request
                .header(&param.name)
                .map(|raw| coerce_text(&param.name, raw, param.ty))
                .transpose(),
            ParamSource::Body => match body_value(self, env, body)? {
                Some(value) => coerce_value(&param.name, value.clone(), param.ty).map(Some),
                None => Ok(None),
            },
            ParamSource::Any => {
                if let Some(raw) = env.request.query(&param.name) {
                    return coerce_text(&param.name, raw, param.ty).map(Some);
                }
                let field = body_value(self, env, body)
                    .ok()
                    .flatten()
                    .and_then(|b| b.get(&param.name).cloned());
                if let Some(value) = field {
                    return coerce_value(&param.name, value, param.ty).map(Some);
                }
                env.request
                    .header(&param.name)
                    .map(|raw| coerce_text(&param.name, raw, param.ty))
                    .transpose()
            }
        }
    }
}

/// Parse the body at most once per request.
fn body_value<'b>(
    binder: &DefaultBinder,
    env: &Environment,
    cache: &'b mut Option<Result<Option<Value>, Error>>,
) -> Result<Option<&'b Value>, Error> {
    let parsed = cache.get_or_insert_with(|| binder.parse_body(env));
    match parsed {
        Ok(value) => Ok(value.as_ref()),
        Err(e) => Err(Error::BadRequest(format!("request body: {}", e))),
    }
}

#[async_trait]
impl ParameterBinder for DefaultBinder {
    async fn bind(
        &self,
        env: &mut Environment,
        _config: &DispatchConfig,
        params: &[ParameterDescriptor],
    ) -> Result<Option<BoundArguments>, Error> {
        let mut body = None;
        let mut arguments = BoundArguments::new();

        for param in params {
            let resolved = match self.resolve(env, &mut body, param) {
                Ok(Some(value)) => value,
                Ok(None) if !param.required => Value::Null,
                Ok(None) => {
                    reject(env, &format!("missing required parameter '{}'", param.name));
                    return Ok(None);
                }
                Err(e) => {
                    reject(env, &e.to_string());
                    return Ok(None);
                }
            };
            arguments.push(param.name.clone(), resolved);
        }

        Ok(Some(arguments))
    }
}

fn reject(env: &mut Environment, message: &str) {
    tracing::debug!(path = %env.request.path, %message, "parameter binding failed");
    let response = &mut env.response;
    response.reset(400);
    response.set_header("Content-Type", "text/plain");
    response.write(message.as_bytes());
}

fn invalid(name: &str, ty: ParamType, detail: impl std::fmt::Display) -> Error {
    Error::BadRequest(format!(
        "parameter '{}' is not a valid {:?}: {}",
        name, ty, detail
    ))
}

/// Coerce a textual value (query string, header) to `ty`.
pub fn coerce_text(name: &str, raw: &str, ty: ParamType) -> Result<Value, Error> {
    match ty {
        ParamType::String => Ok(Value::String(raw.to_string())),
        ParamType::Integer => raw
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| invalid(name, ty, e)),
        ParamType::Float => raw
            .trim()
            .parse::<f64>()
            .map_err(|e| invalid(name, ty, e))
            .and_then(|f| {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| invalid(name, ty, "not a finite number"))
            }),
        ParamType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
            "false" | "0" | "no" | "off" => Ok(Value::Bool(false)),
            other => Err(invalid(name, ty, format!("'{}'", other))),
        },
        ParamType::Json => {
            Ok(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
        }
    }
}

/// Coerce a JSON value (request body) to `ty`. Strings are parsed like text.
pub fn coerce_value(name: &str, value: Value, ty: ParamType) -> Result<Value, Error> {
    match (ty, value) {
        (ParamType::Json, value) => Ok(value),
        (_, Value::String(s)) => coerce_text(name, &s, ty),
        (ParamType::Integer, Value::Number(n)) if n.is_i64() => Ok(Value::Number(n)),
        (ParamType::Float, Value::Number(n)) => Ok(Value::Number(n)),
        (ParamType::Boolean, Value::Bool(b)) => Ok(Value::Bool(b)),
        (ParamType::String, Value::Number(n)) => Ok(Value::String(n.to_string())),
        (ParamType::String, Value::Bool(b)) => Ok(Value::String(b.to_string())),
        (_, other) => Err(invalid(name, ty, format!("unexpected {}", other))),
    }
}
