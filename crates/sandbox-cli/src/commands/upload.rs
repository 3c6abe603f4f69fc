//! `sandbox upload <file>` — parse and persist a skill Markdown document.

use anyhow::{Context, Result};
use colored::*;
use std::path::Path;

use crate::client::GatewayClient;

pub async fn execute(client: &GatewayClient, file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let skill = client.upload_skill(&raw).await?;

    println!("{} Skill uploaded", "✓".green());
    println!("  {} {}", "id:".dimmed(), skill.id);
    println!("  {} {}", "name:".dimmed(), skill.name.cyan());
    if !skill.description.is_empty() {
        println!("  {} {}", "description:".dimmed(), skill.description);
    }
    println!();
    println!("Start a pipeline run with: {} analyze {}", "sandbox".cyan(), skill.id);

    Ok(())
}
