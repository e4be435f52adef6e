//! OpenAPI → LLM tool/function definitions.
//!
//! This is the inverse of payload extraction: the definitions produced here
//! are what the model sees, and the calls it makes back are what the
//! extractors parse.

use crate::error::{OpenApiError, Result};
use crate::refs::resolve_refs;
use crate::spec::OpenApiSpec;
use crate::types::HttpMethod;
use serde_json::{Map, Value, json};
use tracing::warn;

const MIN_REQUIRED_OPENAPI_MAJOR_VERSION: u64 = 3;

/// Attributes copied from a property (or parameter) into a tool schema.
const SCHEMA_ATTRIBUTES: [&str; 3] = ["description", "pattern", "enum"];

/// Converts a spec into a list of vendor-specific function definitions.
pub trait SchemaConverter: Send + Sync {
    fn convert(&self, spec: &OpenApiSpec) -> Result<Vec<Value>>;
}

/// Operation objects of a ref-resolved document, in document order, each
/// paired with its path item.
fn resolved_operations(
    resolved: &Value,
) -> impl Iterator<Item = (&Map<String, Value>, &Map<String, Value>)> {
    resolved
        .get("paths")
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|paths| paths.values())
        .filter_map(Value::as_object)
        .flat_map(|item| {
            item.iter()
                .filter(|(key, _)| HttpMethod::is_method_key(key))
                .filter_map(move |(_, operation)| Some((item, operation.as_object()?)))
        })
}

/// Operation parameters followed by the path item's shared ones, the same
/// order the request builder checks them in.
fn merged_parameters<'a>(
    item: &'a Map<String, Value>,
    operation: &'a Map<String, Value>,
) -> impl Iterator<Item = &'a Value> {
    [operation.get("parameters"), item.get("parameters")]
        .into_iter()
        .flatten()
        .filter_map(Value::as_array)
        .flatten()
}

fn operation_description(operation: &Map<String, Value>) -> &str {
    ["description", "summary"]
        .into_iter()
        .filter_map(|key| operation.get(key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .unwrap_or("")
}

fn json_schema_body(operation: &Map<String, Value>) -> Option<&Map<String, Value>> {
    operation
        .get("requestBody")?
        .get("content")?
        .get("application/json")?
        .get("schema")?
        .as_object()
}

/// OpenAI-style function definitions; also serves Anthropic.
#[derive(Debug, Clone)]
pub struct OpenAiSchemaConverter {
    parameters_name: String,
    wrap_as_function: bool,
}

impl OpenAiSchemaConverter {
    /// `{"type": "function", "function": {name, description, parameters}}`
    pub fn openai() -> Self {
        Self {
            parameters_name: "parameters".to_string(),
            wrap_as_function: true,
        }
    }

    /// `{name, description, input_schema}`
    pub fn anthropic() -> Self {
        Self {
            parameters_name: "input_schema".to_string(),
            wrap_as_function: false,
        }
    }

    fn check_version(spec: &Value) -> Result<()> {
        let version = spec
            .get("openapi")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                OpenApiError::InvalidSpecFormat("could not extract the 'openapi' version".to_string())
            })?;
        let major: u64 = version
            .split('.')
            .next()
            .and_then(|major| major.trim().parse().ok())
            .ok_or_else(|| {
                OpenApiError::InvalidSpecFormat(format!("unparseable openapi version '{}'", version))
            })?;

        if major < MIN_REQUIRED_OPENAPI_MAJOR_VERSION {
            return Err(OpenApiError::InvalidSpecFormat(format!(
                "OpenAPI version {} is not supported, must be at least {}",
                version, MIN_REQUIRED_OPENAPI_MAJOR_VERSION
            )));
        }
        Ok(())
    }

    fn function_definition(
        &self,
        item: &Map<String, Value>,
        operation: &Map<String, Value>,
    ) -> Option<Value> {
        let name = operation.get("operationId").and_then(Value::as_str)?;
        let description = operation_description(operation);

        let mut properties = Map::new();
        let mut required: Vec<Value> = Vec::new();

        if let Some(body) = json_schema_body(operation) {
            if let Some(body_properties) = body.get("properties").and_then(Value::as_object) {
                for (prop_name, prop_schema) in body_properties {
                    properties.insert(prop_name.clone(), parse_property(prop_schema));
                }
                if let Some(body_required) = body.get("required").and_then(Value::as_array) {
                    required.extend(body_required.iter().cloned());
                }
            }
        }

        let mut seen: Vec<&str> = Vec::new();
        for param in merged_parameters(item, operation) {
            let (Some(param_name), Some(schema)) =
                (param.get("name").and_then(Value::as_str), param.get("schema"))
            else {
                continue;
            };
            let param_required = param.get("required").and_then(Value::as_bool).unwrap_or(false);
            let required_name = Value::String(param_name.to_string());
            if param_required && !required.contains(&required_name) {
                required.push(required_name);
            }
            // The first declaration of a name supplies its schema.
            if seen.contains(&param_name) {
                continue;
            }
            seen.push(param_name);

            let mut parsed = parse_property(schema);
            if let Value::Object(parsed) = &mut parsed {
                for attr in SCHEMA_ATTRIBUTES {
                    if let Some(value) = param.get(attr).filter(|v| !is_empty_value(v)) {
                        parsed.insert(attr.to_string(), value.clone());
                    }
                }
            }
            properties.insert(param_name.to_string(), parsed);
        }

        if description.is_empty() || properties.is_empty() {
            warn!("Could not build a function definition for operation '{}'", name);
            return None;
        }

        let mut schema = json!({"type": "object", "properties": properties});
        if !required.is_empty() {
            schema["required"] = Value::Array(required);
        }

        let mut definition = Map::new();
        definition.insert("name".to_string(), json!(name));
        definition.insert("description".to_string(), json!(description));
        definition.insert(self.parameters_name.clone(), schema);
        Some(Value::Object(definition))
    }
}

impl SchemaConverter for OpenAiSchemaConverter {
    fn convert(&self, spec: &OpenApiSpec) -> Result<Vec<Value>> {
        let resolved = resolve_refs(spec.as_value());
        Self::check_version(&resolved)?;

        let definitions = resolved_operations(&resolved)
            .filter_map(|(item, operation)| {
                let definition = self.function_definition(item, operation);
                if definition.is_none() && operation.get("operationId").is_none() {
                    warn!("Operation missing operationId, cannot create function definition");
                }
                definition
            })
            .map(|definition| {
                if self.wrap_as_function {
                    json!({"type": "function", "function": definition})
                } else {
                    definition
                }
            })
            .collect();
        Ok(definitions)
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Reduce a property schema to the attributes a tool schema needs.
fn parse_property(property: &Value) -> Value {
    let mut parsed = Map::new();
    let schema_type = property.get("type").and_then(Value::as_str);
    if let Some(schema_type) = schema_type {
        parsed.insert("type".to_string(), json!(schema_type));
    }
    for attr in SCHEMA_ATTRIBUTES {
        if let Some(value) = property.get(attr) {
            parsed.insert(attr.to_string(), value.clone());
        }
    }

    match schema_type {
        Some("object") => {
            let nested: Map<String, Value> = property
                .get("properties")
                .and_then(Value::as_object)
                .into_iter()
                .flatten()
                .map(|(name, prop)| (name.clone(), parse_property(prop)))
                .collect();
            parsed.insert("properties".to_string(), Value::Object(nested));
            if let Some(required) = property.get("required") {
                parsed.insert("required".to_string(), required.clone());
            }
        }
        Some("array") => {
            let items = property.get("items").cloned().unwrap_or_else(|| json!({}));
            parsed.insert("items".to_string(), parse_property(&items));
        }
        _ => {}
    }

    Value::Object(parsed)
}

/// Cohere tool definitions with flat `parameter_definitions`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CohereSchemaConverter;

impl CohereSchemaConverter {
    fn function_definition(
        item: &Map<String, Value>,
        operation: &Map<String, Value>,
    ) -> Result<Option<Value>> {
        let Some(name) = operation.get("operationId").and_then(Value::as_str) else {
            warn!("Operation missing operationId, cannot create function definition");
            return Ok(None);
        };

        let mut definitions = Map::new();
        for param in merged_parameters(item, operation) {
            let (Some(param_name), Some(schema)) =
                (param.get("name").and_then(Value::as_str), param.get("schema"))
            else {
                continue;
            };
            let required = param.get("required").and_then(Value::as_bool).unwrap_or(false);
            if let Some(existing) = definitions.get_mut(param_name) {
                if required {
                    existing["required"] = json!(true);
                }
                continue;
            }
            let description = param.get("description").and_then(Value::as_str).unwrap_or("");
            definitions.insert(
                param_name.to_string(),
                Self::parse_schema(schema, required, description)?,
            );
        }

        if let Some(body) = json_schema_body(operation) {
            let required: Vec<&str> = body
                .get("required")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .collect();
            for (prop_name, prop_schema) in body
                .get("properties")
                .and_then(Value::as_object)
                .into_iter()
                .flatten()
            {
                let description = prop_schema
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                definitions.insert(
                    prop_name.clone(),
                    Self::parse_schema(prop_schema, required.contains(&prop_name.as_str()), description)?,
                );
            }
        }

        Ok(Some(json!({
            "name": name,
            "description": operation_description(operation),
            "parameter_definitions": definitions,
        })))
    }

    fn parse_schema(schema: &Value, required: bool, description: &str) -> Result<Value> {
        let schema_type = Self::cohere_type(schema)?;
        if schema_type != "object" {
            return Ok(json!({"type": schema_type, "description": description, "required": required}));
        }

        let nested_required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .collect();
        let mut properties = Map::new();
        for (name, prop) in schema
            .get("properties")
            .and_then(Value::as_object)
            .into_iter()
            .flatten()
        {
            let prop_description = prop.get("description").and_then(Value::as_str).unwrap_or("");
            properties.insert(
                name.clone(),
                Self::parse_schema(prop, nested_required.contains(&name.as_str()), prop_description)?,
            );
        }

        Ok(json!({
            "type": schema_type,
            "description": description,
            "properties": properties,
            "required": required,
        }))
    }

    fn cohere_type(schema: &Value) -> Result<&'static str> {
        match schema.get("type").and_then(Value::as_str).unwrap_or("object") {
            "integer" => Ok("int"),
            "string" => Ok("str"),
            "boolean" => Ok("bool"),
            "number" => Ok("float"),
            "object" => Ok("object"),
            "array" => Ok("list"),
            other => Err(OpenApiError::InvalidSpecFormat(format!(
                "unsupported schema type '{}'",
                other
            ))),
        }
    }
}

impl SchemaConverter for CohereSchemaConverter {
    fn convert(&self, spec: &OpenApiSpec) -> Result<Vec<Value>> {
        let resolved = resolve_refs(spec.as_value());
        let mut functions = Vec::new();
        for (item, operation) in resolved_operations(&resolved) {
            if let Some(function) = Self::function_definition(item, operation)? {
                functions.push(function);
            }
        }
        Ok(functions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> OpenApiSpec {
        OpenApiSpec::from_value(json!({
            "openapi": "3.0.1",
            "servers": [{"url": "https://google.serper.dev"}],
            "paths": {
                "/search": {
                    "parameters": [{"name": "shared", "in": "query", "schema": {"type": "string"}}],
                    "post": {
                        "operationId": "search",
                        "description": "Search the web with Google",
                        "parameters": [{
                            "name": "gl",
                            "in": "query",
                            "description": "Country code",
                            "enum": ["us", "de"],
                            "schema": {"type": "string"}
                        }],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/SearchRequest"}
                                }
                            }
                        }
                    }
                },
                "/status": {
                    "get": {"operationId": "status", "summary": "Service status"}
                },
                "/undocumented": {
                    "get": {"summary": "No id here", "parameters": [{"name": "x", "in": "query", "schema": {"type": "string"}}]}
                }
            },
            "components": {
                "schemas": {
                    "SearchRequest": {
                        "type": "object",
                        "required": ["q"],
                        "properties": {
                            "q": {"type": "string", "description": "Query"},
                            "num": {"type": "integer"},
                            "filters": {
                                "type": "object",
                                "required": ["site"],
                                "properties": {"site": {"type": "string"}}
                            },
                            "tags": {"type": "array", "items": {"type": "string", "x-internal": true}}
                        }
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_openai_definitions() {
        let tools = OpenAiSchemaConverter::openai().convert(&spec()).unwrap();
        // "status" has no properties, "/undocumented" has no operationId
        assert_eq!(tools.len(), 1);

        let tool = &tools[0];
        assert_eq!(tool["type"], "function");
        let function = &tool["function"];
        assert_eq!(function["name"], "search");
        assert_eq!(function["description"], "Search the web with Google");

        let parameters = &function["parameters"];
        assert_eq!(parameters["type"], "object");
        assert_eq!(parameters["required"], json!(["q"]));
        assert_eq!(parameters["properties"]["q"], json!({"type": "string", "description": "Query"}));
        assert_eq!(parameters["properties"]["filters"]["required"], json!(["site"]));
        assert_eq!(parameters["properties"]["tags"]["items"], json!({"type": "string"}));
        assert_eq!(parameters["properties"]["shared"], json!({"type": "string"}));
        assert_eq!(
            parameters["properties"]["gl"],
            json!({"type": "string", "description": "Country code", "enum": ["us", "de"]})
        );
    }

    fn user_spec() -> OpenApiSpec {
        OpenApiSpec::from_value(json!({
            "openapi": "3.0.0",
            "servers": [{"url": "https://api.example.com"}],
            "paths": {
                "/users/{id}": {
                    "parameters": [
                        {"name": "id", "in": "path", "required": true, "schema": {"type": "integer"}},
                        {"name": "verbose", "in": "query", "required": true, "schema": {"type": "string"}}
                    ],
                    "get": {
                        "operationId": "getUser",
                        "description": "Fetch one user",
                        "parameters": [{
                            "name": "verbose",
                            "in": "query",
                            "description": "Include details",
                            "schema": {"type": "boolean"}
                        }]
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_shared_path_parameters_exported() {
        let tools = OpenAiSchemaConverter::openai().convert(&user_spec()).unwrap();
        let parameters = &tools[0]["function"]["parameters"];
        assert_eq!(parameters["properties"]["id"], json!({"type": "integer"}));
        assert_eq!(
            parameters["properties"]["verbose"],
            json!({"type": "boolean", "description": "Include details"})
        );
        assert_eq!(parameters["required"], json!(["id", "verbose"]));

        let tools = CohereSchemaConverter.convert(&user_spec()).unwrap();
        let params = &tools[0]["parameter_definitions"];
        assert_eq!(params["id"], json!({"type": "int", "description": "", "required": true}));
        assert_eq!(
            params["verbose"],
            json!({"type": "bool", "description": "Include details", "required": true})
        );
    }

    #[test]
    fn test_exported_required_parameters_build_a_request() {
        use crate::request::RequestBuilder;

        let spec = user_spec();
        let tools = OpenAiSchemaConverter::openai().convert(&spec).unwrap();
        let arguments: Map<String, Value> = tools[0]["function"]["parameters"]["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|name| (name.as_str().unwrap().to_string(), json!(7)))
            .collect();

        let operation = spec.find_operation_by_id("getUser", None).unwrap();
        let request = RequestBuilder::default()
            .build_request(&operation, &arguments)
            .unwrap();
        assert_eq!(request.url, "https://api.example.com/users/7");
    }

    #[test]
    fn test_anthropic_definitions_use_input_schema() {
        let tools = OpenAiSchemaConverter::anthropic().convert(&spec()).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "search");
        assert!(tools[0].get("input_schema").is_some());
        assert!(tools[0].get("type").is_none());
    }

    #[test]
    fn test_openai_rejects_old_versions() {
        let spec = OpenApiSpec::from_value(json!({"openapi": "2.0", "servers": [], "paths": {}})).unwrap();
        let err = OpenAiSchemaConverter::openai().convert(&spec).unwrap_err();
        assert!(matches!(err, OpenApiError::InvalidSpecFormat(_)));
    }

    #[test]
    fn test_cohere_definitions() {
        let tools = CohereSchemaConverter.convert(&spec()).unwrap();
        let names: Vec<&str> = tools.iter().filter_map(|t| t["name"].as_str()).collect();
        assert_eq!(names, vec!["search", "status"]);

        let params = &tools[0]["parameter_definitions"];
        assert_eq!(params["gl"], json!({"type": "str", "description": "Country code", "required": false}));
        assert_eq!(params["q"], json!({"type": "str", "description": "Query", "required": true}));
        assert_eq!(params["num"]["type"], "int");
        assert_eq!(params["tags"]["type"], "list");
        assert_eq!(params["filters"]["properties"]["site"]["required"], json!(true));
        assert_eq!(tools[1]["description"], "Service status");
    }

    #[test]
    fn test_cohere_unsupported_type() {
        let spec = OpenApiSpec::from_value(json!({
            "openapi": "3.0.0",
            "servers": [],
            "paths": {"/a": {"get": {"operationId": "a", "parameters": [
                {"name": "p", "in": "query", "schema": {"type": "null"}}
            ]}}}
        }))
        .unwrap();
        let err = CohereSchemaConverter.convert(&spec).unwrap_err();
        assert!(matches!(err, OpenApiError::InvalidSpecFormat(_)));
    }
}
