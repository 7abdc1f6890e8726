//! Built-in local functions for `local` tools.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value, json};

/// A local function: merged params in, JSON result or error message out.
pub type LocalFn =
    Arc<dyn Fn(&Map<String, Value>) -> Result<Value, String> + Send + Sync + 'static>;

/// Name → function table consulted by `local` tools.
#[derive(Clone, Default)]
pub struct FunctionTable {
    functions: HashMap<String, LocalFn>,
}

impl FunctionTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding `echo` and `code_formatter`.
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        table.register("echo", echo);
        table.register("code_formatter", code_formatter);
        table
    }

    /// Register a function. Replaces any existing function with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&Map<String, Value>) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<&LocalFn> {
        self.functions.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Returns the `text` parameter unchanged.
pub fn echo(params: &Map<String, Value>) -> Result<Value, String> {
    params
        .get("text")
        .cloned()
        .ok_or_else(|| "missing required parameter 'text'".to_string())
}

/// Normalize whitespace in a code snippet: strip trailing whitespace per
/// line, expand tabs to four spaces, trim the whole text and end it with a
/// single newline.
pub fn code_formatter(params: &Map<String, Value>) -> Result<Value, String> {
    let code = params
        .get("code")
        .and_then(Value::as_str)
        .ok_or_else(|| "code must be a string".to_string())?;
    let normalized: Vec<String> = code
        .lines()
        .map(|line| line.trim_end().replace('\t', "    "))
        .collect();
    let mut formatted = normalized.join("\n").trim().to_string();
    formatted.push('\n');
    Ok(json!({ "formatted_code": formatted }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn builtins_are_registered() {
        let table = FunctionTable::with_builtins();
        assert_eq!(table.names(), ["code_formatter", "echo"]);
        assert!(table.get("echo").is_some());
        assert!(table.get("nope").is_none());
    }

    #[test]
    fn echo_returns_text_or_fails() {
        assert_eq!(echo(&params(json!({"text": "hi"}))).unwrap(), json!("hi"));
        assert!(echo(&Map::new()).is_err());
    }

    #[test]
    fn code_formatter_normalizes_whitespace() {
        let out = code_formatter(&params(json!({
            "code": "def  foo():   \n\tprint('hi')\t\n\n",
            "style": "simple"
        })))
        .unwrap();
        assert_eq!(out["formatted_code"], "def  foo():\n    print('hi')\n");
    }

    #[test]
    fn code_formatter_requires_string_code() {
        let err = code_formatter(&params(json!({"code": 3}))).unwrap_err();
        assert_eq!(err, "code must be a string");
    }
}
