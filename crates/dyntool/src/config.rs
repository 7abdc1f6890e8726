//! Config file parsing: JSON or YAML documents describing tool entries.
//!
//! Accepted document shapes:
//!
//! - a top-level list of entries,
//! - an object with a `tools` list,
//! - an OpenAPI 3 / Swagger 2 document (converted via [`crate::openapi`]).
//!
//! Parsing is all-or-nothing per file: one bad entry rejects the file.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::openapi;
use crate::spec::ToolSpec;

/// Default JSON config location, relative to the working directory.
pub const DEFAULT_JSON_PATH: &str = "configs/tools.json";
/// Default YAML config location, relative to the working directory.
pub const DEFAULT_YAML_PATH: &str = "configs/tools.yaml";

/// On-disk format of a config file, picked from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    /// `.json` is JSON; everything else (`.yaml`, `.yml`, no extension) is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }

    fn parse_value(self, text: &str) -> std::result::Result<Value, String> {
        match self {
            Self::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
        }
    }
}

/// Parse one config document into validated tool specs.
///
/// `path` is only used for the format decision and error messages. An empty
/// (whitespace-only) document yields no tools.
pub fn parse_tools(text: &str, path: &Path) -> Result<Vec<ToolSpec>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let doc = ConfigFormat::from_path(path)
        .parse_value(text)
        .map_err(|e| Error::parse(path, e))?;

    let entries = if openapi::is_openapi(&doc) {
        let entries = openapi::convert(&doc);
        info!(
            "Converted {} operations from OpenAPI document {}",
            entries.len(),
            path.display()
        );
        entries
    } else {
        match doc {
            Value::Array(items) => items,
            Value::Object(mut obj) => match obj.remove("tools") {
                Some(Value::Array(items)) => items,
                Some(Value::Null) => Vec::new(),
                _ => {
                    return Err(Error::parse(
                        path,
                        "expected a list of tool entries or an object with a 'tools' list",
                    ));
                }
            },
            _ => {
                return Err(Error::parse(
                    path,
                    "expected a list of tool entries or an object with a 'tools' list",
                ));
            }
        }
    };

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            ToolSpec::from_entry(entry).map_err(|e| Error::parse(path, format!("entry {i}: {e}")))
        })
        .collect()
}

/// Read and parse one config file. Returns `Ok(None)` if it does not exist.
pub fn load_file(path: &Path) -> Result<Option<Vec<ToolSpec>>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(Error::ConfigRead {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    parse_tools(&text, path).map(Some)
}

/// Load every source in order and merge by name.
///
/// Later sources win on duplicate names, as do later entries within one
/// file; both cases are logged. Missing files are skipped. Any parse failure
/// aborts the whole load so the caller never sees a partial set.
pub fn load_sources(paths: &[PathBuf]) -> Result<Vec<ToolSpec>> {
    let mut merged: BTreeMap<String, (ToolSpec, &Path)> = BTreeMap::new();
    for path in paths {
        let Some(specs) = load_file(path)? else {
            warn!("Config path not found: {}", path.display());
            continue;
        };
        debug!("Parsed {} tools from {}", specs.len(), path.display());
        for spec in specs {
            let name = spec.name.clone();
            if let Some((_, previous)) = merged.insert(name.clone(), (spec, path.as_path())) {
                warn!(
                    "Tool '{name}' from {} overrides the definition in {}",
                    path.display(),
                    previous.display()
                );
            }
        }
    }
    Ok(merged.into_values().map(|(spec, _)| spec).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::ToolKind;

    const JSON_TOOLS: &str = r#"{
        "tools": [
            {"name": "echo_tool", "type": "local", "function": "echo", "params": {"text": ""}},
            {"name": "gh", "type": "rest", "endpoint": "https://api.github.com/search/repositories"}
        ]
    }"#;

    const YAML_TOOLS: &str = "
tools:
  - name: du
    description: Disk usage
    type: shell
    command: du -sh {path}
    params:
      path: .
  - name: gh
    type: rest
    endpoint: https://example.com/override
";

    #[test]
    fn format_follows_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("a.JSON")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("a.yaml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.yml")), ConfigFormat::Yaml);
    }

    #[test]
    fn parses_tools_object_and_bare_list() {
        let specs = parse_tools(JSON_TOOLS, Path::new("tools.json")).unwrap();
        assert_eq!(specs.len(), 2);

        let bare = r#"[{"name": "x", "type": "search"}]"#;
        let specs = parse_tools(bare, Path::new("tools.json")).unwrap();
        assert_eq!(specs[0].kind, ToolKind::Search { docs_dir: None });
    }

    #[test]
    fn parses_yaml() {
        let specs = parse_tools(YAML_TOOLS, Path::new("tools.yaml")).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].params["path"], ".");
    }

    #[test]
    fn empty_document_has_no_tools() {
        assert!(parse_tools("  \n", Path::new("tools.yaml")).unwrap().is_empty());
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = parse_tools("{\"tools\": [", Path::new("tools.json")).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));

        let err = parse_tools("tools: 3", Path::new("tools.yaml")).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn one_invalid_entry_rejects_the_file() {
        let text = r#"[{"name": "ok", "type": "search"}, {"type": "local"}]"#;
        let err = parse_tools(text, Path::new("tools.json")).unwrap_err();
        assert!(err.to_string().contains("entry 1"), "{err}");
    }

    #[test]
    fn load_sources_merges_with_last_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("tools.json");
        let yaml = dir.path().join("tools.yaml");
        fs::write(&json, JSON_TOOLS).unwrap();
        fs::write(&yaml, YAML_TOOLS).unwrap();

        let specs = load_sources(&[json, yaml]).unwrap();
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["du", "echo_tool", "gh"]);

        let gh = specs.iter().find(|s| s.name == "gh").unwrap();
        assert!(matches!(
            &gh.kind,
            ToolKind::Rest { endpoint, .. } if endpoint == "https://example.com/override"
        ));
    }

    #[test]
    fn load_sources_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("tools.json");
        fs::write(&json, JSON_TOOLS).unwrap();

        let specs = load_sources(&[json, dir.path().join("missing.yaml")]).unwrap();
        assert_eq!(specs.len(), 2);
    }

    #[test]
    fn load_sources_fails_if_any_file_is_broken() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("tools.json");
        let yaml = dir.path().join("tools.yaml");
        fs::write(&json, JSON_TOOLS).unwrap();
        fs::write(&yaml, "tools: [unclosed").unwrap();

        assert!(load_sources(&[json, yaml]).is_err());
    }
}
