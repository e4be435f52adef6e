//! Read-only view of a single (path, method) operation.

use crate::error::Result;
use crate::refs::deref;
use crate::spec::{OpenApiSpec, empty_map};
use crate::types::{ApiParameter, HttpMethod, ParameterLocation};
use serde_json::{Map, Value};
use tracing::debug;

/// One operation of an [`OpenApiSpec`], plus the document it came from.
///
/// Views are cheap and built per lookup; nothing is cached.
#[derive(Debug, Clone)]
pub struct Operation<'a> {
    path: String,
    method: HttpMethod,
    operation: &'a Map<String, Value>,
    spec: &'a OpenApiSpec,
}

impl<'a> Operation<'a> {
    /// Create a view. Fails if `method` is not a recognized HTTP method.
    pub fn new(
        path: &str,
        method: &str,
        operation: &'a Map<String, Value>,
        spec: &'a OpenApiSpec,
    ) -> Result<Self> {
        Ok(Self {
            path: path.to_string(),
            method: method.parse()?,
            operation,
            spec,
        })
    }

    /// Path template (e.g. "/users/{id}")
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// The document this operation belongs to.
    pub fn spec(&self) -> &'a OpenApiSpec {
        self.spec
    }

    /// The raw operation mapping.
    pub fn as_map(&self) -> &'a Map<String, Value> {
        self.operation
    }

    /// Raw accessor into the operation mapping.
    pub fn get_field(&self, key: &str) -> Option<&'a Value> {
        self.operation.get(key)
    }

    /// `operationId`, or an empty string.
    pub fn operation_id(&self) -> &'a str {
        self.get_field("operationId")
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// `description`, falling back to `summary`.
    pub fn description(&self) -> &'a str {
        ["description", "summary"]
            .into_iter()
            .filter_map(|key| self.get_field(key).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .unwrap_or("")
    }

    /// Operation parameters followed by the path item's shared parameters,
    /// optionally filtered by location. Local `$ref` entries are followed.
    pub fn parameters(&self, location: Option<ParameterLocation>) -> Vec<ApiParameter> {
        let root = self.spec.as_value();
        let shared = self
            .spec
            .paths()
            .get(&self.path)
            .and_then(|item| item.get("parameters"));

        [self.operation.get("parameters"), shared]
            .into_iter()
            .flatten()
            .filter_map(Value::as_array)
            .flatten()
            .filter_map(|raw| {
                let param = ApiParameter::from_value(deref(root, raw));
                if param.is_none() {
                    debug!("Ignoring malformed parameter on {} {}: {}", self.method, self.path, raw);
                }
                param
            })
            .filter(|param| location.is_none_or(|loc| param.location == loc))
            .collect()
    }

    /// `requestBody`, or an empty mapping.
    pub fn request_body(&self) -> &'a Map<String, Value> {
        self.get_field("requestBody")
            .map(|body| deref(self.spec.as_value(), body))
            .and_then(Value::as_object)
            .unwrap_or_else(|| empty_map())
    }

    /// `responses`, or an empty mapping.
    pub fn responses(&self) -> &'a Map<String, Value> {
        self.get_field("responses")
            .and_then(Value::as_object)
            .unwrap_or_else(|| empty_map())
    }

    /// Operation `security` if non-empty, else the document's `security`.
    ///
    /// Each entry maps a scheme name to its scopes.
    pub fn security_requirements(&self) -> &'a [Value] {
        match self.get_field("security").and_then(Value::as_array) {
            Some(requirements) if !requirements.is_empty() => requirements,
            _ => self.spec.security(),
        }
    }

    /// First server URL of the operation, else of the document, else "".
    pub fn server_url(&self) -> &'a str {
        let servers = match self.get_field("servers").and_then(Value::as_array) {
            Some(servers) if !servers.is_empty() => servers.as_slice(),
            _ => self.spec.servers(),
        };
        servers
            .first()
            .and_then(|server| server.get("url"))
            .and_then(Value::as_str)
            .unwrap_or("")
    }
}
