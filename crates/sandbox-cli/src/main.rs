use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use sandbox_cli::commands;
use sandbox_cli::GatewayClient;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "sandbox")]
#[command(about = "Turns a skill definition into a monitored Docker sandbox", long_about = None)]
#[command(version)]
struct Cli {
    /// Base URL of a running gateway (ignored by `serve`)
    #[arg(long, env = "SANDBOX_GATEWAY_URL", default_value = "http://127.0.0.1:8088", global = true)]
    gateway_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a skill Markdown file and persist it
    Upload {
        /// Path to the skill Markdown file
        file: PathBuf,
    },

    /// Start a pipeline run for an uploaded skill
    Analyze {
        /// Skill id returned by `upload`
        skill_id: Uuid,
    },

    /// Print a pipeline run's current state and step timings
    Status {
        /// Run id returned by `analyze`
        run_id: Uuid,
    },

    /// Approve the draft spec and start the build
    Approve {
        run_id: Uuid,
    },

    /// Send a rejected spec back through the analyzer
    Reanalyze {
        run_id: Uuid,
    },

    /// Retry a failed run from its last step
    Retry {
        run_id: Uuid,
    },

    /// Print a sandbox's buffered logs
    Logs {
        /// Sandbox id
        sandbox_id: Uuid,

        /// Keep streaming new log lines and status changes
        #[arg(long)]
        follow: bool,
    },

    /// Stop a running sandbox container
    Stop {
        sandbox_id: Uuid,
    },

    /// Restart a sandbox container
    Restart {
        sandbox_id: Uuid,
    },

    /// Stop and remove a sandbox's container and image
    Destroy {
        sandbox_id: Uuid,
    },

    /// Run the gateway in-process
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8088")]
        port: u16,

        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let client = GatewayClient::new(cli.gateway_url);

    let result = match cli.command {
        Commands::Upload { file } => commands::upload::execute(&client, &file).await,
        Commands::Analyze { skill_id } => commands::analyze::execute(&client, skill_id).await,
        Commands::Status { run_id } => commands::status::execute(&client, run_id).await,
        Commands::Approve { run_id } => commands::review::approve(&client, run_id).await,
        Commands::Reanalyze { run_id } => commands::review::reanalyze(&client, run_id).await,
        Commands::Retry { run_id } => commands::review::retry(&client, run_id).await,
        Commands::Logs { sandbox_id, follow } => commands::logs::execute(&client, sandbox_id, follow).await,
        Commands::Stop { sandbox_id } => commands::lifecycle::stop(&client, sandbox_id).await,
        Commands::Restart { sandbox_id } => commands::lifecycle::restart(&client, sandbox_id).await,
        Commands::Destroy { sandbox_id } => commands::lifecycle::destroy(&client, sandbox_id).await,
        Commands::Serve { host, port, config } => {
            commands::serve::execute(&host, port, config.as_deref()).await
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        for cause in e.chain().skip(1) {
            eprintln!("  {} {}", "Caused by:".dimmed(), cause);
        }
        std::process::exit(1);
    }

    Ok(())
}
