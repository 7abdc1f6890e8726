//! Tool specifications parsed from config entries.
//!
//! A [`ToolSpec`] is immutable once built. Reloads never patch a spec in
//! place; the registry swaps in a whole new set instead.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};

/// One registered tool: identity, human description, invocation strategy
/// and declared parameter defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// Serialized inline as `"type": "<tag>"` plus the strategy's fields.
    #[serde(flatten)]
    pub kind: ToolKind,
    /// Parameter name → default value or type hint.
    pub params: Map<String, Value>,
}

/// How a tool is executed. Selected by the entry's `type` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolKind {
    /// Calls a built-in local function by name (`type: local` or `function`).
    Local { function: String },
    /// Calls an HTTP endpoint.
    Rest { endpoint: String, method: HttpMethod },
    /// Full-text search over a local directory of `.txt` / `.md` files.
    Search {
        #[serde(skip_serializing_if = "Option::is_none")]
        docs_dir: Option<String>,
    },
    /// Runs a shell command template with `{param}` placeholders.
    Shell { command: String },
}

impl ToolKind {
    /// The canonical `type` tag for this strategy.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Local { .. } => "local",
            Self::Rest { .. } => "rest",
            Self::Search { .. } => "search",
            Self::Shell { .. } => "shell",
        }
    }
}

/// HTTP verbs accepted for `rest` tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            other => Err(format!("unsupported HTTP method: {other}")),
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

// ── Entry validation ────────────────────────────────────────────────

impl ToolSpec {
    /// Validate and normalize one raw config entry.
    ///
    /// A missing `type` defaults to `rest`. Returns a human-readable message
    /// on failure; the caller attaches the file path.
    pub fn from_entry(raw: &Value) -> Result<Self, String> {
        let obj = raw
            .as_object()
            .ok_or_else(|| "tool entry must be an object".to_string())?;

        let name = match obj.get("name") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            _ => return Err("missing or invalid 'name'".to_string()),
        };
        let description = match obj.get("description") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(format!("tool '{name}': 'description' must be a string")),
        };
        let params = match obj.get("params") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(m)) => m.clone(),
            Some(_) => return Err(format!("tool '{name}': 'params' must be a mapping")),
        };

        let tag = match obj.get("type") {
            None | Some(Value::Null) => "rest",
            Some(Value::String(s)) => s.as_str(),
            Some(_) => return Err(format!("tool '{name}': 'type' must be a string")),
        };
        let required = |field: &str| -> Result<String, String> {
            match obj.get(field) {
                Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
                _ => Err(format!("{tag} tool '{name}' requires a '{field}' string")),
            }
        };

        let kind = match tag {
            "local" | "function" => ToolKind::Local {
                function: required("function")?,
            },
            "rest" => {
                let method = match obj.get("method") {
                    None | Some(Value::Null) => HttpMethod::Get,
                    Some(Value::String(s)) => s.parse()?,
                    Some(_) => return Err(format!("tool '{name}': 'method' must be a string")),
                };
                ToolKind::Rest {
                    endpoint: required("endpoint")?,
                    method,
                }
            }
            "search" => ToolKind::Search {
                docs_dir: obj.get("docs_dir").and_then(Value::as_str).map(String::from),
            },
            "shell" => ToolKind::Shell {
                command: required("command")?,
            },
            other => {
                return Err(format!(
                    "tool '{name}': invalid type '{other}', expected one of local, function, rest, search, shell"
                ));
            }
        };

        Ok(Self {
            name,
            description,
            kind,
            params,
        })
    }
}
