//! `sandbox stop|restart|destroy <sandbox-id>` — lifecycle control proxied
//! to the sandbox's monitor actor.

use anyhow::Result;
use colored::*;
use uuid::Uuid;

use crate::client::GatewayClient;

pub async fn stop(client: &GatewayClient, sandbox_id: Uuid) -> Result<()> {
    client.stop_sandbox(sandbox_id).await?;
    println!("{} Sandbox stopping", "✓".green());
    Ok(())
}

pub async fn restart(client: &GatewayClient, sandbox_id: Uuid) -> Result<()> {
    client.restart_sandbox(sandbox_id).await?;
    println!("{} Sandbox restarting", "✓".green());
    Ok(())
}

pub async fn destroy(client: &GatewayClient, sandbox_id: Uuid) -> Result<()> {
    client.destroy_sandbox(sandbox_id).await?;
    println!("{} Sandbox destroyed", "✓".green());
    Ok(())
}
