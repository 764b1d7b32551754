//! Value conversion for typed property lookups.
//!
//! # Design Decisions
//! - Values are `serde_json::Value`; targets are anything `Deserialize`
//! - Strict conversion is plain deserialization
//! - Lenient conversion retries with coerced candidates: `"true"` → bool,
//!   `"8080"` → number, `"a,b"` → sequence, `"CONSOLE"` → `"console"`

use std::any::type_name;
use std::sync::{Arc, OnceLock};

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// A value could not be converted to the requested type.
#[derive(Debug, Error)]
#[error("cannot convert '{key}' = {value} to {target}")]
pub struct ConversionError {
    pub key: String,
    pub value: String,
    pub target: &'static str,
    #[source]
    pub source: serde_json::Error,
}

/// Shared lenient converter.
#[derive(Debug, Default)]
pub struct ConversionService {
    _private: (),
}

impl ConversionService {
    /// The process-wide instance.
    pub fn shared() -> Arc<ConversionService> {
        static SHARED: OnceLock<Arc<ConversionService>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(ConversionService::default())))
    }

    /// Convert leniently.
    pub fn convert<T: DeserializeOwned>(&self, key: &str, value: &Value) -> Result<T, ConversionError> {
        let strict_error = match serde_json::from_value::<T>(value.clone()) {
            Ok(converted) => return Ok(converted),
            Err(err) => err,
        };

        for candidate in candidates(value) {
            if let Ok(converted) = serde_json::from_value::<T>(candidate) {
                return Ok(converted);
            }
        }

        Err(conversion_error::<T>(key, value, strict_error))
    }
}

/// Convert without coercion.
pub fn convert_strict<T: DeserializeOwned>(key: &str, value: &Value) -> Result<T, ConversionError> {
    serde_json::from_value::<T>(value.clone()).map_err(|err| conversion_error::<T>(key, value, err))
}

fn conversion_error<T>(key: &str, value: &Value, source: serde_json::Error) -> ConversionError {
    ConversionError {
        key: key.to_string(),
        value: value.to_string(),
        target: type_name::<T>(),
        source,
    }
}

fn candidates(value: &Value) -> Vec<Value> {
    match value {
        Value::String(text) => {
            let text = text.trim();
            let mut out = Vec::new();
            if let Some(scalar) = scalar(text) {
                out.push(scalar);
            }
            out.push(Value::String(text.to_lowercase().replace('_', "-")));
            if text.is_empty() {
                out.push(Value::Array(Vec::new()));
            } else {
                let parts = text
                    .split(',')
                    .map(str::trim)
                    .map(|part| scalar(part).unwrap_or_else(|| Value::String(part.to_string())))
                    .collect();
                out.push(Value::Array(parts));
                let raw_parts = text
                    .split(',')
                    .map(|part| Value::String(part.trim().to_string()))
                    .collect();
                out.push(Value::Array(raw_parts));
            }
            out
        }
        Value::Number(number) => vec![
            Value::String(number.to_string()),
            Value::Array(vec![value.clone()]),
        ],
        Value::Bool(flag) => vec![
            Value::String(flag.to_string()),
            Value::Array(vec![value.clone()]),
        ],
        _ => Vec::new(),
    }
}

fn scalar(text: &str) -> Option<Value> {
    if text.eq_ignore_ascii_case("true") {
        return Some(Value::Bool(true));
    }
    if text.eq_ignore_ascii_case("false") {
        return Some(Value::Bool(false));
    }
    if let Ok(int) = text.parse::<i64>() {
        return Some(Value::from(int));
    }
    if let Ok(float) = text.parse::<f64>() {
        if float.is_finite() {
            return Some(Value::from(float));
        }
    }
    None
}
