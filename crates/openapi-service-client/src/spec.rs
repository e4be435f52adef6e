//! In-memory OpenAPI document and the structural queries made against it.
//!
//! The document is kept as a raw JSON value rather than a typed OpenAPI
//! model: lookups run in document order and must tolerate keys that a strict
//! model would reject (shared `parameters` on path items, vendor extensions,
//! partial documents).

use crate::error::{OpenApiError, Result};
use crate::operation::Operation;
use crate::refs::resolve_refs;
use crate::types::HttpMethod;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timeout for fetching a spec from a URL.
const SPEC_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// How much structure is demanded of a document at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecPolicy {
    /// `openapi`, `paths` and `servers` must all be present
    #[default]
    Strict,
    /// Any mapping is accepted
    Lenient,
}

/// A parsed OpenAPI document. Read-only once constructed.
#[derive(Debug, Clone)]
pub struct OpenApiSpec {
    spec: Value,
}

pub(crate) fn empty_map() -> &'static Map<String, Value> {
    static EMPTY: OnceLock<Map<String, Value>> = OnceLock::new();
    EMPTY.get_or_init(Map::new)
}

impl OpenApiSpec {
    /// Wrap an already-parsed document, applying the strict structural check.
    pub fn from_value(spec: Value) -> Result<Self> {
        Self::from_value_with_policy(spec, SpecPolicy::Strict)
    }

    /// Wrap an already-parsed document under the given policy.
    pub fn from_value_with_policy(spec: Value, policy: SpecPolicy) -> Result<Self> {
        let Some(map) = spec.as_object() else {
            return Err(OpenApiError::InvalidSpecFormat(format!(
                "expected a mapping at the document root, got {}",
                crate::error::json_type_name(&spec)
            )));
        };

        if policy == SpecPolicy::Strict {
            let missing: Vec<&str> = ["openapi", "paths", "servers"]
                .into_iter()
                .filter(|key| !map.contains_key(*key))
                .collect();
            if !missing.is_empty() {
                return Err(OpenApiError::InvalidSpecFormat(format!(
                    "missing required key(s): {}. See https://swagger.io/specification/ for details",
                    missing.join(", ")
                )));
            }
        }

        Ok(Self { spec })
    }

    /// Parse a spec from a string.
    ///
    /// JSON is tried first, then YAML.
    pub fn from_str(content: &str) -> Result<Self> {
        Self::from_str_with_policy(content, SpecPolicy::Strict)
    }

    /// Parse a spec from a string under the given policy.
    pub fn from_str_with_policy(content: &str, policy: SpecPolicy) -> Result<Self> {
        let spec = match serde_json::from_str::<Value>(content) {
            Ok(value) => value,
            Err(json_err) => {
                debug!("Spec is not JSON ({}), trying YAML", json_err);
                let yaml: serde_yaml::Value = serde_yaml::from_str(content).map_err(|e| {
                    OpenApiError::InvalidSpecFormat(format!(
                        "content cannot be decoded as JSON or YAML: {}",
                        e
                    ))
                })?;
                yaml_to_json(yaml)?
            }
        };
        Self::from_value_with_policy(spec, policy)
    }

    /// Load and parse a spec from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_file_with_policy(path, SpecPolicy::Strict)
    }

    /// Load and parse a spec from a file under the given policy.
    pub fn from_file_with_policy(path: impl AsRef<Path>, policy: SpecPolicy) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading OpenAPI spec from file: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_str_with_policy(&content, policy)
    }

    /// Load and parse a spec from a URL.
    pub async fn from_url(url: &str) -> Result<Self> {
        Self::from_url_with_policy(url, SpecPolicy::Strict).await
    }

    /// Load and parse a spec from a URL under the given policy.
    pub async fn from_url_with_policy(url: &str, policy: SpecPolicy) -> Result<Self> {
        info!("Loading OpenAPI spec from URL: {}", url);
        let client = reqwest::Client::builder()
            .timeout(SPEC_FETCH_TIMEOUT)
            .build()?;
        let response = client.get(url).send().await?;
        let status = response.status();
        let content = response.text().await?;
        if !status.is_success() {
            return Err(OpenApiError::Transport {
                status: Some(status.as_u16()),
                message: format!("failed to fetch the specification from {}: {}", url, content),
            });
        }
        Self::from_str_with_policy(&content, policy)
    }

    /// The API title (`info.title`), or an empty string.
    pub fn title(&self) -> &str {
        self.spec
            .get("info")
            .and_then(|info| info.get("title"))
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// Path template → path item, in document order.
    pub fn paths(&self) -> &Map<String, Value> {
        self.section(&["paths"])
    }

    /// `components.securitySchemes`, or an empty mapping.
    pub fn security_schemes(&self) -> &Map<String, Value> {
        self.section(&["components", "securitySchemes"])
    }

    /// Top-level `security` requirements, or an empty list.
    pub fn security(&self) -> &[Value] {
        self.spec
            .get("security")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Top-level `servers`, or an empty list.
    pub fn servers(&self) -> &[Value] {
        self.spec
            .get("servers")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The raw document.
    pub fn as_value(&self) -> &Value {
        &self.spec
    }

    /// The document, optionally with all local `$ref`s inlined.
    pub fn to_value(&self, resolve_references: bool) -> Value {
        if resolve_references {
            resolve_refs(&self.spec)
        } else {
            self.spec.clone()
        }
    }

    /// Get the operation at an exact path.
    ///
    /// Without a method the path must define exactly one operation.
    pub fn get_operation(&self, path: &str, method: Option<&str>) -> Result<Operation<'_>> {
        match self.paths().get(path) {
            Some(path_item) => self.operation_item(path, path_item, method),
            None => Err(OpenApiError::OperationNotFound(format!(
                "no path '{}' in spec",
                path
            ))),
        }
    }

    /// Get the operation at the first path (in document order) containing `partial`.
    pub fn find_operation_by_path_substring(
        &self,
        partial: &str,
        method: Option<&str>,
    ) -> Result<Operation<'_>> {
        self.paths()
            .iter()
            .find(|(path, _)| path.contains(partial))
            .map(|(path, path_item)| self.operation_item(path, path_item, method))
            .unwrap_or_else(|| {
                Err(OpenApiError::OperationNotFound(format!(
                    "no path containing '{}'",
                    partial
                )))
            })
    }

    /// Get the first operation whose `operationId` contains `operation_id`.
    ///
    /// Each path is resolved to an operation before its id is checked, so a
    /// path with several operations and no `method` fails as ambiguous even
    /// if only one of them would have matched.
    pub fn find_operation_by_id(
        &self,
        operation_id: &str,
        method: Option<&str>,
    ) -> Result<Operation<'_>> {
        for (path, path_item) in self.paths() {
            let operation = self.operation_item(path, path_item, method)?;
            if operation.operation_id().contains(operation_id) {
                debug!(
                    "Resolved operationId '{}' to {} {}",
                    operation_id,
                    operation.method(),
                    path
                );
                return Ok(operation);
            }
        }
        Err(OpenApiError::OperationNotFound(format!(
            "no operation with operationId '{}'",
            operation_id
        )))
    }

    /// Every operation in the document, in document order.
    ///
    /// Path-item keys that are not HTTP methods are skipped with a warning.
    pub fn operations(&self) -> Vec<Operation<'_>> {
        let mut operations = Vec::new();
        for (path, path_item) in self.paths() {
            let Some(item) = path_item.as_object() else {
                warn!("Path item for '{}' is not a mapping, skipping", path);
                continue;
            };
            for (key, operation) in item {
                if !HttpMethod::is_method_key(key) {
                    warn!("Skipping non-operation key '{}' at path '{}'", key, path);
                    continue;
                }
                match operation.as_object() {
                    Some(operation) => {
                        if let Ok(op) = Operation::new(path, key, operation, self) {
                            operations.push(op);
                        }
                    }
                    None => warn!("Operation {} {} is not a mapping, skipping", key, path),
                }
            }
        }
        debug!("Found {} operations", operations.len());
        operations
    }

    fn operation_item<'a>(
        &'a self,
        path: &str,
        path_item: &'a Value,
        method: Option<&str>,
    ) -> Result<Operation<'a>> {
        let item = path_item.as_object().unwrap_or_else(|| empty_map());

        if let Some(method) = method {
            let key = method.to_ascii_lowercase();
            return match item.get(&key).and_then(Value::as_object) {
                Some(operation) if !operation.is_empty() => {
                    Operation::new(path, &key, operation, self)
                }
                _ => Err(OpenApiError::OperationNotFound(format!(
                    "no operation for method {} at path '{}'",
                    method, path
                ))),
            };
        }

        let methods: Vec<(&String, &Value)> = item
            .iter()
            .filter(|(key, _)| HttpMethod::is_method_key(key))
            .collect();

        match methods.as_slice() {
            [(key, operation)] => {
                let operation = operation.as_object().unwrap_or_else(|| empty_map());
                Operation::new(path, key, operation, self)
            }
            [] => Err(OpenApiError::OperationNotFound(format!(
                "no operations at path '{}'",
                path
            ))),
            many => Err(OpenApiError::AmbiguousOperation {
                path: path.to_string(),
                methods: many
                    .iter()
                    .map(|(key, _)| key.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    fn section(&self, keys: &[&str]) -> &Map<String, Value> {
        let mut node = &self.spec;
        for key in keys {
            match node.get(*key) {
                Some(next) => node = next,
                None => return empty_map(),
            }
        }
        node.as_object().unwrap_or_else(|| empty_map())
    }
}

/// Convert a YAML document into JSON, stringifying scalar mapping keys
/// (`200:` under `responses` is an integer key in YAML).
fn yaml_to_json(value: serde_yaml::Value) -> Result<Value> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| {
                        OpenApiError::InvalidSpecFormat(format!("unsupported number: {}", n))
                    })?
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                let key = match key {
                    Yaml::String(s) => s,
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    Yaml::Null => "null".to_string(),
                    other => {
                        return Err(OpenApiError::InvalidSpecFormat(format!(
                            "unsupported mapping key: {:?}",
                            other
                        )));
                    }
                };
                map.insert(key, yaml_to_json(value)?);
            }
            Value::Object(map)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}
