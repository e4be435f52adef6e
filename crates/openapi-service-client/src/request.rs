//! Request assembly: operation + call arguments → authenticated request draft.

use crate::auth::{AuthenticationStrategy, PassThroughAuthentication};
use crate::error::{OpenApiError, Result};
use crate::operation::Operation;
use crate::types::{HttpMethod, ParameterLocation};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Username/password pair for transports that take basic auth separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BasicCredentials {
    pub username: String,
    pub password: Option<String>,
}

/// A fully assembled, not-yet-sent HTTP request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestDraft {
    /// Absolute URL with path parameters substituted
    pub url: String,
    pub method: HttpMethod,
    pub headers: BTreeMap<String, String>,
    /// Query parameters, left unencoded for the transport
    pub params: Map<String, Value>,
    pub cookies: BTreeMap<String, String>,
    /// JSON body, if the operation declares one
    pub json: Option<Value>,
    /// Basic credentials handed to the transport instead of an
    /// `Authorization` header. The built-in strategies never set this; it is
    /// there for custom [`AuthenticationStrategy`] implementations.
    pub auth: Option<BasicCredentials>,
}

impl RequestDraft {
    pub fn new(url: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            url: url.into(),
            method,
            headers: BTreeMap::new(),
            params: Map::new(),
            cookies: BTreeMap::new(),
            json: None,
            auth: None,
        }
    }
}

/// Builds request drafts for operations and applies the configured authentication.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    auth: Arc<dyn AuthenticationStrategy>,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new(Arc::new(PassThroughAuthentication))
    }
}

impl RequestBuilder {
    pub fn new(auth: Arc<dyn AuthenticationStrategy>) -> Self {
        Self { auth }
    }

    /// Build the request for `operation` from the call `arguments`.
    ///
    /// An argument counts as present when its key exists, whatever its value.
    #[instrument(skip_all, fields(operation_id = operation.operation_id(), method = %operation.method()))]
    pub fn build_request(
        &self,
        operation: &Operation<'_>,
        arguments: &Map<String, Value>,
    ) -> Result<RequestDraft> {
        let url = build_url(operation, arguments)?;
        let mut request = RequestDraft::new(url, operation.method());

        for (name, value) in collect(operation, arguments, ParameterLocation::Header)? {
            request.headers.insert(name, stringify(value));
        }
        for (name, value) in collect(operation, arguments, ParameterLocation::Query)? {
            request.params.insert(name, value.clone());
        }
        request.json = build_body(operation, arguments)?;

        self.apply_authentication(operation, &mut request)?;

        debug!("Built request: {} {}", request.method, request.url);
        Ok(request)
    }

    /// Apply the first requirement whose first scheme is defined in the spec.
    /// Only one scheme is ever applied.
    fn apply_authentication(
        &self,
        operation: &Operation<'_>,
        request: &mut RequestDraft,
    ) -> Result<()> {
        let schemes = operation.spec().security_schemes();

        let selected = operation
            .security_requirements()
            .iter()
            .filter_map(|requirement| requirement.as_object()?.keys().next())
            .find_map(|name| schemes.get(name).map(|scheme| (name, scheme)));

        if let Some((name, scheme)) = selected {
            debug!("Applying security scheme '{}'", name);
            self.auth.apply_auth(scheme, request)?;
        }
        Ok(())
    }
}

fn build_url(operation: &Operation<'_>, arguments: &Map<String, Value>) -> Result<String> {
    let values = collect(operation, arguments, ParameterLocation::Path)?;
    let path = substitute_path(operation.path(), |name| {
        values
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| stringify(value))
    });
    Ok(format!("{}{}", operation.server_url(), path))
}

/// Replace `{name}` placeholders in one pass over `template`, so substituted
/// values are never scanned again. Unknown placeholders are kept as written.
fn substitute_path(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut path = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|close| open + close) else {
            break;
        };
        path.push_str(&rest[..open]);
        let placeholder = &rest[open..=close];
        match lookup(&rest[open + 1..close]) {
            Some(value) => path.push_str(&value),
            None => path.push_str(placeholder),
        }
        rest = &rest[close + 1..];
    }
    path.push_str(rest);
    path
}

/// Arguments for every parameter at `location`, failing on a missing required one.
fn collect<'v>(
    operation: &Operation<'_>,
    arguments: &'v Map<String, Value>,
    location: ParameterLocation,
) -> Result<Vec<(String, &'v Value)>> {
    let mut found = Vec::new();
    for param in operation.parameters(Some(location)) {
        match arguments.get(&param.name) {
            Some(value) => found.push((param.name, value)),
            None if param.required => {
                return Err(OpenApiError::MissingRequiredParameter {
                    location: location.to_string(),
                    name: param.name,
                    operation: operation.operation_id().to_string(),
                });
            }
            None => {}
        }
    }
    Ok(found)
}

/// The body is the whole argument map when the operation takes JSON.
fn build_body(operation: &Operation<'_>, arguments: &Map<String, Value>) -> Result<Option<Value>> {
    let request_body = operation.request_body();
    if request_body.is_empty() {
        return Ok(None);
    }

    let content = request_body.get("content").and_then(Value::as_object);
    match content {
        Some(content) if content.contains_key(JSON_CONTENT_TYPE) => {
            Ok(Some(Value::Object(arguments.clone())))
        }
        _ => Err(OpenApiError::UnsupportedContentType {
            operation: operation.operation_id().to_string(),
            content_types: content
                .map(|c| c.keys().cloned().collect::<Vec<_>>().join(", "))
                .unwrap_or_default(),
        }),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ApiKeyAuthentication, HttpAuthentication};
    use crate::spec::OpenApiSpec;
    use serde_json::json;

    fn spec() -> OpenApiSpec {
        OpenApiSpec::from_value(json!({
            "openapi": "3.0.0",
            "servers": [{"url": "https://api.example.com"}],
            "paths": {
                "/users/{id}": {
                    "get": {
                        "operationId": "getUser",
                        "parameters": [
                            {"name": "id", "in": "path", "required": true},
                            {"name": "X-Request-Id", "in": "header", "required": true},
                            {"name": "limit", "in": "query", "required": true},
                            {"name": "verbose", "in": "query"}
                        ],
                        "security": [{"undefined": []}, {"apiKeyAuth": []}, {"basicAuth": []}]
                    }
                },
                "/orders": {
                    "post": {
                        "operationId": "createOrder",
                        "requestBody": {
                            "content": {"application/json": {"schema": {"type": "object"}}}
                        }
                    }
                },
                "/upload": {
                    "post": {
                        "operationId": "upload",
                        "requestBody": {"content": {"multipart/form-data": {}}}
                    }
                }
            },
            "components": {
                "securitySchemes": {
                    "apiKeyAuth": {"type": "apiKey", "in": "header", "name": "X-API-Key"},
                    "basicAuth": {"type": "http", "scheme": "basic"}
                }
            }
        }))
        .unwrap()
    }

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("arguments must be an object"),
        }
    }

    #[test]
    fn test_build_request_all_locations() {
        let spec = spec();
        let op = spec.get_operation("/users/{id}", None).unwrap();
        let builder = RequestBuilder::default();

        let request = builder
            .build_request(
                &op,
                &args(json!({"id": 42, "X-Request-Id": "abc", "limit": 10, "verbose": true})),
            )
            .unwrap();

        assert_eq!(request.url, "https://api.example.com/users/42");
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.headers["X-Request-Id"], "abc");
        assert_eq!(request.params["limit"], json!(10));
        assert_eq!(request.params["verbose"], json!(true));
        assert!(request.json.is_none());
    }

    #[test]
    fn test_path_values_are_not_substituted_twice() {
        let spec = OpenApiSpec::from_value(json!({
            "openapi": "3.0.0",
            "servers": [{"url": "https://api.example.com"}],
            "paths": {
                "/a/{x}/{y}": {
                    "get": {
                        "operationId": "twoSegments",
                        "parameters": [
                            {"name": "x", "in": "path", "required": true},
                            {"name": "y", "in": "path", "required": true}
                        ]
                    }
                }
            }
        }))
        .unwrap();
        let op = spec.get_operation("/a/{x}/{y}", None).unwrap();
        let request = RequestBuilder::default()
            .build_request(&op, &args(json!({"x": "{y}", "y": "Z"})))
            .unwrap();
        assert_eq!(request.url, "https://api.example.com/a/{y}/Z");
    }

    #[test]
    fn test_substitute_path() {
        let lookup = |name: &str| (name == "id").then(|| "42".to_string());
        assert_eq!(substitute_path("/users/{id}/posts", lookup), "/users/42/posts");
        assert_eq!(substitute_path("/users/{other}", lookup), "/users/{other}");
        assert_eq!(substitute_path("/open/{id", lookup), "/open/{id");
        assert_eq!(substitute_path("/{id}{id}", lookup), "/4242");
    }

    #[test]
    fn test_missing_required_path_parameter() {
        let spec = spec();
        let op = spec.get_operation("/users/{id}", None).unwrap();
        let err = RequestBuilder::default()
            .build_request(&op, &args(json!({"X-Request-Id": "abc", "limit": 1})))
            .unwrap_err();

        match err {
            OpenApiError::MissingRequiredParameter {
                location,
                name,
                operation,
            } => {
                assert_eq!(location, "path");
                assert_eq!(name, "id");
                assert_eq!(operation, "getUser");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_required_header_and_query() {
        let spec = spec();
        let op = spec.get_operation("/users/{id}", None).unwrap();

        let err = RequestBuilder::default()
            .build_request(&op, &args(json!({"id": 1, "limit": 1})))
            .unwrap_err();
        assert!(matches!(err, OpenApiError::MissingRequiredParameter { ref location, .. } if location == "header"));

        let err = RequestBuilder::default()
            .build_request(&op, &args(json!({"id": 1, "X-Request-Id": "abc"})))
            .unwrap_err();
        assert!(matches!(err, OpenApiError::MissingRequiredParameter { ref location, .. } if location == "query"));
    }

    #[test]
    fn test_falsy_values_count_as_present() {
        let spec = spec();
        let op = spec.get_operation("/users/{id}", None).unwrap();
        let request = RequestBuilder::default()
            .build_request(
                &op,
                &args(json!({"id": 0, "X-Request-Id": "", "limit": 0, "verbose": false})),
            )
            .unwrap();

        assert_eq!(request.url, "https://api.example.com/users/0");
        assert_eq!(request.headers["X-Request-Id"], "");
        assert_eq!(request.params["limit"], json!(0));
        assert_eq!(request.params["verbose"], json!(false));
    }

    #[test]
    fn test_json_body_is_whole_argument_map() {
        let spec = spec();
        let op = spec.find_operation_by_id("createOrder", None).unwrap();
        let order = json!({
            "customer": {"name": "John", "address": {"city": "Berlin"}},
            "items": [{"sku": "A-1", "quantity": 2}]
        });

        let request = RequestBuilder::default()
            .build_request(&op, &args(order.clone()))
            .unwrap();
        assert_eq!(request.json, Some(order));
        assert_eq!(request.url, "https://api.example.com/orders");
    }

    #[test]
    fn test_unsupported_content_type() {
        let spec = spec();
        let op = spec.get_operation("/upload", None).unwrap();
        let err = RequestBuilder::default()
            .build_request(&op, &Map::new())
            .unwrap_err();
        assert!(matches!(err, OpenApiError::UnsupportedContentType { ref content_types, .. } if content_types == "multipart/form-data"));
    }

    #[test]
    fn test_only_first_defined_scheme_applied() {
        let spec = spec();
        let op = spec.get_operation("/users/{id}", None).unwrap();
        let builder = RequestBuilder::new(Arc::new(ApiKeyAuthentication::new("k").unwrap()));

        let request = builder
            .build_request(&op, &args(json!({"id": 1, "X-Request-Id": "r", "limit": 1})))
            .unwrap();
        // "undefined" is skipped, "apiKeyAuth" applied, "basicAuth" never reached
        assert_eq!(request.headers["X-API-Key"], "k");
        assert!(!request.headers.contains_key("Authorization"));
    }

    #[test]
    fn test_no_requirements_no_auth() {
        let spec = spec();
        let op = spec.find_operation_by_id("createOrder", None).unwrap();
        // An HTTP strategy would fail on any non-http scheme; nothing is applied here.
        let builder = RequestBuilder::new(Arc::new(HttpAuthentication::bearer("t").unwrap()));
        let request = builder.build_request(&op, &Map::new()).unwrap();
        assert!(request.headers.is_empty());
    }

    #[test]
    fn test_custom_strategy_sets_transport_credentials() {
        #[derive(Debug)]
        struct TransportBasicAuth;

        impl AuthenticationStrategy for TransportBasicAuth {
            fn apply_auth(&self, _scheme: &Value, request: &mut RequestDraft) -> Result<()> {
                request.auth = Some(BasicCredentials {
                    username: "admin".to_string(),
                    password: Some("secret".to_string()),
                });
                Ok(())
            }
        }

        let spec = spec();
        let op = spec.get_operation("/users/{id}", None).unwrap();
        let request = RequestBuilder::new(Arc::new(TransportBasicAuth))
            .build_request(&op, &args(json!({"id": 1, "X-Request-Id": "r", "limit": 1})))
            .unwrap();
        assert_eq!(
            request.auth,
            Some(BasicCredentials {
                username: "admin".to_string(),
                password: Some("secret".to_string()),
            })
        );
        assert!(!request.headers.contains_key("Authorization"));
    }

    #[test]
    fn test_auth_errors_propagate() {
        let spec = spec();
        let op = spec.get_operation("/users/{id}", None).unwrap();
        let builder = RequestBuilder::new(Arc::new(HttpAuthentication::bearer("t").unwrap()));
        let err = builder
            .build_request(&op, &args(json!({"id": 1, "X-Request-Id": "r", "limit": 1})))
            .unwrap_err();
        assert!(matches!(err, OpenApiError::SchemeMismatch { .. }));
    }
}
