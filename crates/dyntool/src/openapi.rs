//! Conversion of OpenAPI 3 / Swagger 2 documents into `rest` tool entries.
//!
//! Each `get`/`post`/`put`/`delete`/`patch` operation becomes one raw entry
//! in the same shape a hand-written config uses, so it goes through the
//! normal [`ToolSpec::from_entry`](crate::spec::ToolSpec::from_entry)
//! validation afterwards.

use serde_json::{Map, Value, json};

const OPERATION_METHODS: &[&str] = &["get", "post", "put", "delete", "patch"];

/// Whether a parsed document looks like an OpenAPI or Swagger spec.
pub fn is_openapi(doc: &Value) -> bool {
    doc.as_object()
        .is_some_and(|o| o.contains_key("openapi") || o.contains_key("swagger"))
}

/// Convert every supported operation in `doc` into a raw tool entry.
pub fn convert(doc: &Value) -> Vec<Value> {
    let base = base_url(doc);
    let Some(paths) = doc.get("paths").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    for (path, methods) in paths {
        let Some(methods) = methods.as_object() else {
            continue;
        };
        for (method, op) in methods {
            let method = method.to_ascii_lowercase();
            if !OPERATION_METHODS.contains(&method.as_str()) {
                continue;
            }
            let name = op
                .get("operationId")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| generated_name(&method, path));
            let description = op
                .get("summary")
                .or_else(|| op.get("description"))
                .and_then(Value::as_str)
                .unwrap_or_default();

            let mut params = Map::new();
            for p in op
                .get("parameters")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                let Some(pname) = p.get("name").and_then(Value::as_str) else {
                    continue;
                };
                let hint = ["schema", "example", "default"]
                    .iter()
                    .find_map(|k| p.get(*k).filter(|v| !v.is_null()))
                    .cloned()
                    .unwrap_or(Value::Null);
                params.insert(pname.to_string(), hint);
            }
            if op.get("requestBody").is_some_and(|b| !b.is_null()) {
                params.insert("body".to_string(), Value::Null);
            }

            entries.push(json!({
                "name": name,
                "description": description,
                "type": "rest",
                "endpoint": format!("{base}{path}"),
                "method": method.to_ascii_uppercase(),
                "params": params,
            }));
        }
    }
    entries
}

/// First server URL (v3) or `host + basePath` (v2), without a trailing `/`.
fn base_url(doc: &Value) -> String {
    let from_servers = doc
        .get("servers")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find_map(|s| s.get("url").and_then(Value::as_str))
        .filter(|url| !url.is_empty());
    if let Some(url) = from_servers {
        return url.trim_end_matches('/').to_string();
    }
    if doc.get("swagger").and_then(Value::as_str) == Some("2.0")
        && let Some(host) = doc.get("host").and_then(Value::as_str)
        && !host.is_empty()
    {
        let base_path = doc.get("basePath").and_then(Value::as_str).unwrap_or("");
        return format!("{host}{base_path}").trim_end_matches('/').to_string();
    }
    String::new()
}

/// `get /repos/{owner}/issues` → `get_repos_owner_issues`; `/` → `<method>_root`.
fn generated_name(method: &str, path: &str) -> String {
    let slug: String = path
        .trim_matches('/')
        .replace('/', "_")
        .chars()
        .filter(|c| *c != '{' && *c != '}')
        .collect();
    if slug.is_empty() {
        format!("{method}_root")
    } else {
        format!("{method}_{slug}")
    }
}
