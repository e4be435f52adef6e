//! Local `$ref` resolution over a raw OpenAPI document.

use serde_json::{Map, Value};
use tracing::warn;

/// Return a copy of `root` with every local (`#/...`) reference inlined.
///
/// Remote references are kept as-is. A reference that points back into one
/// of its own ancestors is left unresolved to break the cycle.
pub fn resolve_refs(root: &Value) -> Value {
    let mut stack = Vec::new();
    resolve_node(root, root, &mut stack)
}

/// Follow a single local reference, without recursing into the target.
pub(crate) fn lookup_ref<'a>(root: &'a Value, reference: &str) -> Option<&'a Value> {
    let pointer = reference.strip_prefix('#')?;
    root.pointer(pointer)
}

/// If `value` is a `{"$ref": ...}` object pointing inside `root`, return the
/// target; otherwise return `value` itself.
pub(crate) fn deref<'a>(root: &'a Value, value: &'a Value) -> &'a Value {
    match value.get("$ref").and_then(Value::as_str) {
        Some(reference) => lookup_ref(root, reference).unwrap_or(value),
        None => value,
    }
}

fn resolve_node(root: &Value, node: &Value, stack: &mut Vec<String>) -> Value {
    match node {
        Value::Object(map) => {
            if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
                if stack.iter().any(|r| r == reference) {
                    return node.clone();
                }
                return match lookup_ref(root, reference) {
                    Some(target) => {
                        stack.push(reference.to_string());
                        let resolved = resolve_node(root, target, stack);
                        stack.pop();
                        resolved
                    }
                    None => {
                        if reference.starts_with('#') {
                            warn!("Unresolvable reference: {}", reference);
                        }
                        node.clone()
                    }
                };
            }

            let resolved: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), resolve_node(root, v, stack)))
                .collect();
            Value::Object(resolved)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| resolve_node(root, item, stack))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_nested_refs() {
        let doc = json!({
            "paths": {
                "/orders": {
                    "post": {
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/Order"}
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Order": {
                        "type": "object",
                        "properties": {"customer": {"$ref": "#/components/schemas/Customer"}}
                    },
                    "Customer": {"type": "object", "properties": {"name": {"type": "string"}}}
                }
            }
        });

        let resolved = resolve_refs(&doc);
        let schema = &resolved["paths"]["/orders"]["post"]["requestBody"]["content"]
            ["application/json"]["schema"];
        assert_eq!(schema["type"], "object");
        assert_eq!(
            schema["properties"]["customer"]["properties"]["name"]["type"],
            "string"
        );
    }

    #[test]
    fn test_cyclic_ref_is_left_unresolved() {
        let doc = json!({
            "components": {
                "schemas": {
                    "Node": {
                        "type": "object",
                        "properties": {"next": {"$ref": "#/components/schemas/Node"}}
                    }
                }
            },
            "root": {"$ref": "#/components/schemas/Node"}
        });

        let resolved = resolve_refs(&doc);
        assert_eq!(resolved["root"]["type"], "object");
        assert_eq!(
            resolved["root"]["properties"]["next"]["$ref"],
            "#/components/schemas/Node"
        );
    }

    #[test]
    fn test_remote_ref_kept() {
        let doc = json!({"a": {"$ref": "other.yaml#/Thing"}});
        assert_eq!(resolve_refs(&doc), doc);
    }
}
