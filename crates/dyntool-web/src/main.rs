//! Serve the dyntool HTTP API over a directory of config files.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p dyntool-web -- --init
//! cargo run -p dyntool-web -- --port 8080 --config-dir ./configs
//! cargo run -p dyntool-web -- --static-dir ./web/out --docs-dir ./papers
//! ```
//!
//! Then:
//!
//! ```bash
//! curl localhost:3001/api/tools
//! curl -X POST localhost:3001/api/invoke \
//!   -H 'content-type: application/json' \
//!   -d '{"name": "echo_tool", "params": {"text": "hi"}}'
//! ```

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use dyntool::DispatcherConfig;
use dyntool::samples::ensure_example_configs;
use dyntool_web::{WebConfig, spawn_web};
use tracing_subscriber::EnvFilter;

/// HTTP API for config-defined tools.
#[derive(Parser)]
#[command(about = "Serve config-defined tools over HTTP with hot reload")]
struct Args {
    /// Interface to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port to listen on.
    #[arg(long, default_value_t = 3001)]
    port: u16,

    /// Directory holding tools.json and tools.yaml.
    #[arg(long, default_value = "configs")]
    config_dir: PathBuf,

    /// Front-end build served for non-API paths.
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Default directory for `search` tools.
    #[arg(long, default_value = "papers")]
    docs_dir: PathBuf,

    /// Working directory for `shell` tools.
    #[arg(long, default_value = ".")]
    shell_workdir: PathBuf,

    /// Config poll interval in milliseconds (0 relies on file notifications only).
    #[arg(long, default_value_t = 2000)]
    poll_ms: u64,

    /// Write example configs into the config directory if missing.
    #[arg(long)]
    init: bool,

    /// Do not watch the config files; reload only on save.
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = WebConfig::default()
        .with_bind_addr((args.host, args.port).into())
        .with_config_dir(&args.config_dir)
        .with_watch(!args.no_watch)
        .with_poll_interval((args.poll_ms > 0).then(|| Duration::from_millis(args.poll_ms)))
        .with_dispatcher(
            DispatcherConfig::default()
                .with_search_root(args.docs_dir)
                .with_shell_workdir(args.shell_workdir),
        );
    let config = match args.static_dir {
        Some(dir) => config.with_static_dir(dir),
        None => config,
    };

    if args.init {
        let files = config.files();
        ensure_example_configs(&files.json, &files.yaml).map_err(|e| e.to_string())?;
    }

    let server = spawn_web(config).await.map_err(|e| e.to_string())?;
    println!("API: http://{}/api/tools", server.addr);
    println!("Press Ctrl-C to exit.");

    tokio::signal::ctrl_c().await.map_err(|e| e.to_string())?;
    server.shutdown().await;
    Ok(())
}
