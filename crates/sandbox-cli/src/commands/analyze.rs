//! `sandbox analyze <skill-id>` — start a pipeline run for an uploaded skill.

use anyhow::Result;
use colored::*;
use uuid::Uuid;

use crate::client::GatewayClient;

pub async fn execute(client: &GatewayClient, skill_id: Uuid) -> Result<()> {
    let run_id = client.start_pipeline(skill_id).await?;

    println!("{} Pipeline started", "✓".green());
    println!("  {} {}", "run_id:".dimmed(), run_id);
    println!();
    println!("Watch it with: {} status {}", "sandbox".cyan(), run_id);

    Ok(())
}
