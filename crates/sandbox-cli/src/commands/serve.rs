//! `sandbox serve [--port] [--host] [--config]` — run the gateway
//! in-process, mirroring `commands/serve.rs`'s self-hosting command.

use anyhow::Result;
use colored::*;
use sandbox_core::SandboxConfig;
use std::path::Path;

pub async fn execute(host: &str, port: u16, config_path: Option<&Path>) -> Result<()> {
    let config = match config_path {
        Some(path) => SandboxConfig::from_toml_file(path)?,
        None => SandboxConfig::default(),
    }
    .with_env_overrides();

    println!("{} Starting sandbox gateway...", "\u{1F680}".green());
    println!();
    println!("  {} {}", "listening:".dimmed(), format!("http://{host}:{port}").cyan());
    println!("  {} {}", "docs:".dimmed(), format!("http://{host}:{port}/docs/api").cyan());
    println!("  {} {}", "db:".dimmed(), config.expanded_db_path().dimmed());
    println!();

    sandbox_gateway::serve(config, host, port).await
}
