//! Example config files written on first run.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};

/// Example JSON config: one tool of every local/rest/shell kind.
pub const SAMPLE_JSON: &str = r#"{
  "tools": [
    {
      "name": "echo_tool",
      "description": "Echo the given text back",
      "type": "local",
      "function": "echo",
      "params": {"text": "hello"}
    },
    {
      "name": "code_formatter",
      "description": "Normalize whitespace in a code snippet",
      "type": "local",
      "function": "code_formatter",
      "params": {"style": "simple"}
    },
    {
      "name": "github_repo_search",
      "description": "Search GitHub repositories by query",
      "type": "rest",
      "endpoint": "https://api.github.com/search/repositories",
      "method": "GET",
      "params": {"q": "language:rust", "per_page": 3}
    },
    {
      "name": "disk_usage",
      "description": "Report the size of a directory",
      "type": "shell",
      "command": "du -sh {path}",
      "params": {"path": "."}
    }
  ]
}
"#;

/// Example YAML config: search and a second REST tool.
pub const SAMPLE_YAML: &str = r#"# Tools defined in YAML are loaded after tools.json.
tools:
  - name: paper_search
    description: "Search local papers (txt/md) by keywords"
    type: search
    params:
      query: ""
      top_k: 5

  - name: stack_overflow_search
    description: "Fetch StackOverflow questions matching a query"
    type: rest
    endpoint: "https://api.stackexchange.com/2.3/search/advanced"
    method: GET
    params:
      order: "desc"
      sort: "relevance"
      site: "stackoverflow"
      pagesize: 3
"#;

/// Write the sample configs to any of the two paths that do not exist yet.
/// Existing files are left untouched.
pub fn ensure_example_configs(json_path: &Path, yaml_path: &Path) -> Result<()> {
    write_if_missing(json_path, SAMPLE_JSON)?;
    write_if_missing(yaml_path, SAMPLE_YAML)
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        info!("Config already exists at {}", path.display());
        return Ok(());
    }
    let write_err = |source| Error::ConfigWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(write_err)?;
    }
    fs::write(path, content).map_err(write_err)?;
    info!("Wrote example config to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_tools;

    #[test]
    fn samples_parse() {
        let json = parse_tools(SAMPLE_JSON, Path::new("tools.json")).unwrap();
        assert_eq!(json.len(), 4);
        let yaml = parse_tools(SAMPLE_YAML, Path::new("tools.yaml")).unwrap();
        assert_eq!(yaml.len(), 2);
    }

    #[test]
    fn does_not_overwrite_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("configs/tools.json");
        let yaml = dir.path().join("configs/tools.yaml");

        ensure_example_configs(&json, &yaml).unwrap();
        assert_eq!(fs::read_to_string(&json).unwrap(), SAMPLE_JSON);

        fs::write(&yaml, "tools: []").unwrap();
        ensure_example_configs(&json, &yaml).unwrap();
        assert_eq!(fs::read_to_string(&yaml).unwrap(), "tools: []");
    }
}
