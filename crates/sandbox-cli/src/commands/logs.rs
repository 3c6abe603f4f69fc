//! `sandbox logs <sandbox-id> [--follow]` — snapshot or SSE-tail the
//! sandbox monitor's log buffer.

use anyhow::{Context, Result};
use colored::*;
use futures::StreamExt;
use sandbox_core::events::SandboxEvent;
use uuid::Uuid;

use crate::client::GatewayClient;

pub async fn execute(client: &GatewayClient, sandbox_id: Uuid, follow: bool) -> Result<()> {
    let lines = client.get_sandbox_logs(sandbox_id).await?;
    for line in &lines {
        println!("{line}");
    }

    if !follow {
        return Ok(());
    }

    println!("{}", "-- following, ctrl-c to stop --".dimmed());

    let mut stream = client.stream_sandbox_events(sandbox_id).await?;
    let mut buf = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("lost connection to the gateway")?;
        buf.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(pos) = buf.find("\n\n") {
            let frame = buf[..pos].to_string();
            buf.drain(..pos + 2);
            print_frame(&frame);
        }
    }

    Ok(())
}

fn print_frame(frame: &str) {
    let data = frame
        .lines()
        .find_map(|line| line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")));
    let Some(data) = data else { return };

    match serde_json::from_str::<SandboxEvent>(data) {
        Ok(SandboxEvent::LogLine { text }) => println!("{text}"),
        Ok(SandboxEvent::StatusChange { raw_status }) => {
            println!("{} {}", "status changed:".yellow(), raw_status);
        }
        Err(_) => {}
    }
}
