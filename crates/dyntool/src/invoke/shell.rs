//! `shell` tools: a command template run through `sh -c`.
//!
//! Placeholders of the form `{name}` are replaced with the matching
//! parameter: strings verbatim, anything else as JSON. Parameters are not
//! escaped; a shell tool runs whatever its config and caller say.

use std::path::Path;

use serde_json::{Map, Value, json};
use tokio::process::Command;

/// Fill `{param}` placeholders in `template`. Unknown placeholders are left
/// as-is.
pub fn render_command(template: &str, params: &Map<String, Value>) -> String {
    let mut command = template.to_string();
    for (key, value) in params {
        let placeholder = format!("{{{key}}}");
        if !command.contains(&placeholder) {
            continue;
        }
        let replacement = match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        command = command.replace(&placeholder, &replacement);
    }
    command
}

/// Run the rendered command in `workdir`.
///
/// Returns `{"exit_code", "stdout", "stderr"}`; a non-zero exit is an error
/// carrying both streams.
pub async fn run(
    workdir: &Path,
    template: &str,
    params: &Map<String, Value>,
) -> Result<Value, String> {
    let command = render_command(template, params);
    let output = Command::new("sh")
        .arg("-c")
        .arg(&command)
        .current_dir(workdir)
        .output()
        .await
        .map_err(|e| format!("Error running command: {e}"))?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    if !output.status.success() {
        return Err(format!(
            "Command failed ({}):\n{stdout}\n{stderr}",
            output.status
        ));
    }
    Ok(json!({
        "exit_code": output.status.code(),
        "stdout": stdout,
        "stderr": stderr,
    }))
}
