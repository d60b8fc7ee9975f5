use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use oneview::config::ClientConfig;
use oneview::connection::{Connection, HttpConnection};
use oneview::logging;
use oneview::tasks::{Task, TaskMonitor, TaskOutcome, TaskPhase, WaitTimeout};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "oneview")]
#[command(about = "Inspect and wait for OneView appliance tasks", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = logging::DEFAULT_LEVEL)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Work with appliance tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
}

#[derive(Subcommand)]
enum TaskCommands {
    /// Print the current task document
    Show {
        /// Task URI, e.g. /rest/tasks/<id>
        uri: String,
    },

    /// Wait for a task to finish and print what it produced
    Wait {
        /// Task URI, e.g. /rest/tasks/<id>
        uri: String,

        /// Give up after this many seconds (waits forever when omitted)
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Print the resource a finished task acted upon
    Resource {
        /// Task URI, e.g. /rest/tasks/<id>
        uri: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level).context("Failed to initialize logging")?;

    let config = ClientConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let connection = Arc::new(
        HttpConnection::new(&config).context("Failed to create appliance connection")?,
    );
    if let Some(credentials) = &config.credentials {
        connection
            .login(credentials)
            .with_context(|| format!("Failed to log in to {}", config.host))?;
    }

    let shared: Arc<dyn Connection> = connection.clone();
    let monitor = TaskMonitor::new(shared)
        .with_connection_failure_timeout(config.connection_failure_timeout());

    let result = match cli.command {
        Commands::Task { command } => run_task_command(&monitor, command),
    };

    if let Err(e) = connection.logout() {
        tracing::warn!(error = %e, "failed to close login session");
    }
    result
}

fn run_task_command(monitor: &TaskMonitor, command: TaskCommands) -> Result<()> {
    match command {
        TaskCommands::Show { uri } => {
            let task = monitor
                .get(&Task::from(uri.as_str()))
                .with_context(|| format!("Failed to fetch task {uri}"))?;
            eprintln!("{}", state_line(&task));
            print_json(&task.to_value())
        }
        TaskCommands::Wait { uri, timeout } => {
            let outcome = monitor
                .wait_for_task(&Task::from(uri.as_str()), WaitTimeout::from(timeout))
                .with_context(|| format!("Task {uri} did not complete successfully"))?;
            match &outcome {
                TaskOutcome::Deleted => eprintln!("{} resource deleted", "OK:".green().bold()),
                TaskOutcome::Entity(_) => eprintln!("{} task completed", "OK:".green().bold()),
                TaskOutcome::Task(_) => eprintln!(
                    "{} task completed without an associated resource",
                    "OK:".yellow().bold()
                ),
            }
            print_json(&outcome.into_value())
        }
        TaskCommands::Resource { uri } => {
            let task = monitor
                .get(&Task::from(uri.as_str()))
                .with_context(|| format!("Failed to fetch task {uri}"))?;
            if task.is_running() {
                anyhow::bail!("Task {uri} is still running ({})", state_label(&task));
            }
            let (_, entity) = monitor
                .get_associated_resource(&task)
                .with_context(|| format!("Failed to resolve the resource of task {uri}"))?;
            print_json(&entity.into_value())
        }
    }
}

fn state_label(task: &Task) -> String {
    task.task_state.clone().unwrap_or_else(|| "Unknown".to_string())
}

fn state_line(task: &Task) -> String {
    let label = state_label(task);
    let state = match task.phase() {
        TaskPhase::Running => label.cyan().bold(),
        TaskPhase::Failed => label.red().bold(),
        TaskPhase::Finished => label.green().bold(),
    };
    match task.name.as_deref() {
        Some(name) => format!("{name}: {state}"),
        None => state.to_string(),
    }
}

fn print_json(value: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to render JSON")?;
    println!("{text}");
    Ok(())
}
