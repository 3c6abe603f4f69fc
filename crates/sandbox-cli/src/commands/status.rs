//! `sandbox status <run-id>` — print a pipeline run's current state.

use anyhow::Result;
use colored::*;
use sandbox_core::{PipelineRun, RunStatus};
use uuid::Uuid;

use crate::client::GatewayClient;

pub async fn execute(client: &GatewayClient, run_id: Uuid) -> Result<()> {
    let run = client.get_pipeline_status(run_id).await?;
    print_run(&run);
    Ok(())
}

fn print_run(run: &PipelineRun) {
    println!();
    println!("{} {}", "Pipeline run:".bold(), run.id);
    println!("  {} {}", "status:".dimmed(), colored_status(run.status));
    println!("  {} {}/6", "step:".dimmed(), run.current_step.max(0));

    if let Some(ref msg) = run.error_message {
        println!("  {} {}", "error:".dimmed(), msg.red());
    }

    if let Some(ref spec_id) = run.sandbox_spec_id {
        println!("  {} {}", "sandbox_spec_id:".dimmed(), spec_id);
    }
    if let Some(ref sandbox_id) = run.sandbox_id {
        println!("  {} {}", "sandbox_id:".dimmed(), sandbox_id);
    }

    if !run.step_timings.is_empty() {
        println!();
        println!("  {}", "timings".bold());
        let mut timings: Vec<_> = run.step_timings.iter().collect();
        timings.sort_by_key(|(_, ms)| **ms);
        for (step, ms) in timings {
            println!("    {:<12} {}ms", step, ms);
        }
    }

    println!();
    match run.status {
        RunStatus::Reviewing => {
            println!(
                "Review the draft spec, then {} / {} / {}",
                "approve".green(),
                "reanalyze".yellow(),
                format!("retry {}", run.id).dimmed()
            );
        }
        RunStatus::Failed => {
            println!("Retry with: {} retry {}", "sandbox".cyan(), run.id);
        }
        RunStatus::Ready => {
            if let Some(sandbox_id) = run.sandbox_id {
                println!("Tail logs with: {} logs {} --follow", "sandbox".cyan(), sandbox_id);
            }
        }
        _ => {}
    }
}

fn colored_status(status: RunStatus) -> ColoredString {
    match status {
        RunStatus::Ready => status.to_string().green(),
        RunStatus::Failed => status.to_string().red(),
        RunStatus::Reviewing => status.to_string().yellow(),
        _ => status.to_string().cyan(),
    }
}
