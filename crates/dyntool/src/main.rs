//! Inspect, invoke and watch config-defined tools from the terminal.
//!
//! # Examples
//!
//! ```sh
//! # Write example configs under configs/
//! dyntool init
//!
//! # List tools from the default configs
//! dyntool list
//!
//! # Invoke a tool with parameters
//! dyntool invoke echo_tool --params '{"text": "hi"}'
//!
//! # Log reloads as the configs are edited
//! dyntool --config my-tools.yaml watch
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use dyntool::config::{DEFAULT_JSON_PATH, DEFAULT_YAML_PATH};
use dyntool::samples::ensure_example_configs;
use dyntool::{
    ConfigWatcher, Dispatcher, DispatcherConfig, ReloadReason, Reloader, ToolRegistry, WatchConfig,
};
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

/// Inspect, invoke and watch config-defined tools.
#[derive(Parser)]
#[command(name = "dyntool")]
struct Cli {
    /// Config file to load (repeatable; later files win on duplicate names).
    #[arg(long = "config", global = true)]
    configs: Vec<PathBuf>,

    /// Directory scanned by `search` tools that do not name one.
    #[arg(long, global = true, default_value = "papers")]
    docs_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write example tools.json / tools.yaml if they do not exist.
    Init,
    /// Print the loaded tools as JSON.
    List,
    /// Invoke one tool and print the result envelope.
    Invoke {
        /// Tool name.
        name: String,
        /// Parameters as a JSON object.
        #[arg(long, default_value = "{}")]
        params: String,
    },
    /// Watch the config files and log every reload until Ctrl-C.
    Watch {
        /// Poll interval in milliseconds (0 disables polling).
        #[arg(long, default_value_t = 2000)]
        poll_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let paths = if cli.configs.is_empty() {
        vec![PathBuf::from(DEFAULT_JSON_PATH), PathBuf::from(DEFAULT_YAML_PATH)]
    } else {
        cli.configs
    };

    let registry = ToolRegistry::new();
    let reloader = Reloader::new(paths.clone(), registry.clone());

    match cli.command {
        Command::Init => {
            ensure_example_configs(
                &PathBuf::from(DEFAULT_JSON_PATH),
                &PathBuf::from(DEFAULT_YAML_PATH),
            )
            .map_err(|e| e.to_string())?;
        }
        Command::List => {
            reloader
                .reload(&ReloadReason::Startup)
                .map_err(|e| e.to_string())?;
            let tools = serde_json::json!({ "tools": registry.list() });
            println!("{}", serde_json::to_string_pretty(&tools).unwrap_or_default());
        }
        Command::Invoke { name, params } => {
            let params: Map<String, Value> = serde_json::from_str(&params)
                .map_err(|e| format!("--params must be a JSON object: {e}"))?;
            reloader
                .reload(&ReloadReason::Startup)
                .map_err(|e| e.to_string())?;
            let dispatcher = Dispatcher::new(
                registry,
                DispatcherConfig::default().with_search_root(cli.docs_dir),
            )
            .map_err(|e| e.to_string())?;
            let result = dispatcher.invoke(&name, params).await;
            println!("{}", serde_json::to_string_pretty(&result).unwrap_or_default());
            if !result.is_ok() {
                std::process::exit(1);
            }
        }
        Command::Watch { poll_ms } => {
            if let Err(e) = reloader.reload(&ReloadReason::Startup) {
                // Keep watching; the next valid edit will load.
                eprintln!("Error: {e}");
            }
            let reloads = reloader.spawn();
            let poll = (poll_ms > 0).then(|| Duration::from_millis(poll_ms));
            let watcher = ConfigWatcher::new(WatchConfig::new(paths).with_poll_interval(poll))
                .spawn(reloads)
                .map_err(|e| e.to_string())?;
            println!("Watching {} tools. Press Ctrl-C to exit.", registry.len());
            tokio::signal::ctrl_c().await.map_err(|e| e.to_string())?;
            watcher.shutdown().await;
            println!("Registered tools at exit: {}", registry.names().join(", "));
        }
    }

    Ok(())
}
