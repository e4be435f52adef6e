//! Extraction of "function name + arguments" from LLM completion payloads.
//!
//! Vendors nest the function call differently, but each call object carries
//! a `name` plus one vendor-specific argument field:
//!
//! | Vendor    | Argument field | Encoding                 |
//! |-----------|----------------|--------------------------|
//! | OpenAI    | `arguments`    | JSON string (or object)  |
//! | Anthropic | `input`        | object                   |
//! | Cohere    | `parameters`   | object                   |
//!
//! The payload is searched depth-first for the first mapping holding all
//! required fields.

use crate::error::{OpenApiError, Result, json_type_name};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

/// Conversion of a vendor payload into a JSON value before it is searched.
///
/// Every `Serialize` type gets this for free, so SDK response structs can be
/// handed to the client directly.
pub trait ToJsonValue {
    fn to_json_value(&self) -> Result<Value>;
}

impl<T: Serialize + ?Sized> ToJsonValue for T {
    fn to_json_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(OpenApiError::PayloadEncodeError)
    }
}

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionInvocation {
    /// Operation identifier
    pub name: String,
    /// Decoded call arguments
    pub arguments: Map<String, Value>,
}

/// Normalizes one vendor's function-call payload into a [`FunctionInvocation`].
pub trait FunctionPayloadExtractor: Send + Sync + fmt::Debug {
    /// Fields that must all be present on the call object.
    fn required_fields(&self) -> Vec<&str>;

    /// Find and decode the function call in `payload`.
    ///
    /// Returns `Ok(None)` when no node carries the required fields.
    fn extract_function_invocation(&self, payload: &Value) -> Result<Option<FunctionInvocation>>;
}

/// Extractor parameterized by the name of the argument field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultPayloadExtractor {
    arguments_field_name: String,
}

impl DefaultPayloadExtractor {
    pub fn new(arguments_field_name: impl Into<String>) -> Self {
        Self {
            arguments_field_name: arguments_field_name.into(),
        }
    }

    /// `{"name": ..., "arguments": "<json>"}`
    pub fn openai() -> Self {
        Self::new("arguments")
    }

    /// `{"name": ..., "input": {...}}`
    pub fn anthropic() -> Self {
        Self::new("input")
    }

    /// `{"name": ..., "parameters": {...}}`
    pub fn cohere() -> Self {
        Self::new("parameters")
    }

    pub fn arguments_field_name(&self) -> &str {
        &self.arguments_field_name
    }

    fn decode_arguments(&self, value: &Value) -> Result<Map<String, Value>> {
        let field = &self.arguments_field_name;
        match value {
            Value::Object(map) => Ok(map.clone()),
            Value::String(encoded) => {
                let decoded: Value = serde_json::from_str(encoded).map_err(|source| {
                    OpenApiError::ArgumentDecodeError {
                        field: field.clone(),
                        source,
                    }
                })?;
                match decoded {
                    Value::Object(map) => Ok(map),
                    other => Err(OpenApiError::InvalidArgumentType {
                        field: field.clone(),
                        found: json_type_name(&other),
                        expected: "object",
                    }),
                }
            }
            other => Err(OpenApiError::InvalidArgumentType {
                field: field.clone(),
                found: json_type_name(other),
                expected: "string or object",
            }),
        }
    }
}

impl FunctionPayloadExtractor for DefaultPayloadExtractor {
    fn required_fields(&self) -> Vec<&str> {
        vec!["name", self.arguments_field_name.as_str()]
    }

    fn extract_function_invocation(&self, payload: &Value) -> Result<Option<FunctionInvocation>> {
        let Some(found) = search(payload, &self.required_fields()) else {
            debug!(
                "No node with fields {:?} found in payload",
                self.required_fields()
            );
            return Ok(None);
        };

        let name = match &found["name"] {
            Value::String(name) if !name.is_empty() => name.clone(),
            other => {
                return Err(OpenApiError::InvalidArgumentType {
                    field: "name".to_string(),
                    found: json_type_name(other),
                    expected: "non-empty string",
                });
            }
        };
        let arguments = self.decode_arguments(&found[self.arguments_field_name.as_str()])?;

        debug!("Extracted invocation of '{}'", name);
        Ok(Some(FunctionInvocation { name, arguments }))
    }
}

/// Depth-first search for the first mapping that contains every field.
///
/// The node itself is checked before its children; mapping values are
/// visited in key order and sequence items in index order.
pub fn search<'a>(payload: &'a Value, required_fields: &[&str]) -> Option<&'a Map<String, Value>> {
    match payload {
        Value::Object(map) => {
            if required_fields.iter().all(|field| map.contains_key(*field)) {
                return Some(map);
            }
            map.values()
                .find_map(|value| search(value, required_fields))
        }
        Value::Array(items) => items
            .iter()
            .find_map(|item| search(item, required_fields)),
        _ => None,
    }
}
