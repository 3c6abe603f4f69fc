//! `sandbox approve|reanalyze|retry <run-id>` — drive the human review gate.

use anyhow::Result;
use colored::*;
use uuid::Uuid;

use crate::client::GatewayClient;

pub async fn approve(client: &GatewayClient, run_id: Uuid) -> Result<()> {
    client.approve(run_id).await?;
    println!("{} Spec approved, build started", "✓".green());
    Ok(())
}

pub async fn reanalyze(client: &GatewayClient, run_id: Uuid) -> Result<()> {
    client.re_analyze(run_id).await?;
    println!("{} Re-analysis requested", "✓".green());
    Ok(())
}

pub async fn retry(client: &GatewayClient, run_id: Uuid) -> Result<()> {
    client.retry(run_id).await?;
    println!("{} Retry requested", "✓".green());
    Ok(())
}
