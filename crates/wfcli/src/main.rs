// crates/wfcli/src/main.rs

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use wfcore::io::{export_file_name, export_workflow, import_workflow};
use wfcore::templates::workflow_templates;
use wfcore::{ExecutionContext, ExecutionLog, LogStatus, Workflow};
use wfruntime::{analyze, RunOptions, RuntimeConfig, WorkflowRuntime};

#[derive(Parser)]
#[command(name = "wf")]
#[command(about = "Workflow engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Path to workflow JSON file (exported or plain)
        #[arg(short, long)]
        file: PathBuf,

        /// Initial context as a JSON object, e.g. '{"value": 150}'
        #[arg(short, long)]
        input: Option<String>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Pause before each node, in milliseconds
        #[arg(long)]
        pace_ms: Option<u64>,

        /// Cancel the run after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Check a workflow file without running it
    Validate {
        /// Path to workflow JSON file
        file: PathBuf,
    },

    /// List available node types
    Nodes,

    /// List built-in workflow templates
    Templates,

    /// Write a built-in template as an exported workflow file
    Init {
        /// Template number, see `wf templates`
        #[arg(short, long, default_value_t = 0)]
        template: usize,

        /// Output file path (defaults to a name derived from the template)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Run { verbose: true, .. });
    init_tracing(verbose);

    match cli.command {
        Commands::Run {
            file,
            input,
            pace_ms,
            timeout_secs,
            ..
        } => {
            run_workflow(file, input, pace_ms, timeout_secs).await?;
        }

        Commands::Validate { file } => {
            validate_workflow(file)?;
        }

        Commands::Nodes => {
            list_nodes();
        }

        Commands::Templates => {
            list_templates();
        }

        Commands::Init { template, output } => {
            create_from_template(template, output)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

/// Accepts both the export format and a bare workflow document.
fn load_workflow(file: &PathBuf) -> Result<Workflow> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    if let Some(workflow) = import_workflow(&raw) {
        return Ok(workflow);
    }
    serde_json::from_str(&raw).with_context(|| format!("{} is not a workflow", file.display()))
}

fn parse_input(input: Option<String>) -> Result<ExecutionContext> {
    let Some(raw) = input else {
        return Ok(ExecutionContext::new());
    };
    match serde_json::from_str(&raw)? {
        serde_json::Value::Object(map) => Ok(ExecutionContext::from(map)),
        _ => Err(anyhow!("Input must be a JSON object")),
    }
}

fn print_log(log: &ExecutionLog) {
    let marker = match log.status {
        LogStatus::Pending => "…",
        LogStatus::Running => "⚡",
        LogStatus::Success => "✅",
        LogStatus::Error => "❌",
        LogStatus::Skipped => "⏭️",
    };
    println!(
        "  {} [{}] {}: {}",
        marker,
        log.timestamp.format("%H:%M:%S%.3f"),
        log.node_label,
        log.message.as_deref().unwrap_or("")
    );
}

async fn run_workflow(
    file: PathBuf,
    input: Option<String>,
    pace_ms: Option<u64>,
    timeout_secs: Option<u64>,
) -> Result<()> {
    println!("🚀 Loading workflow from: {}", file.display());

    let workflow = load_workflow(&file)?;

    println!("📋 Workflow: {}", workflow.name);
    println!("   Nodes: {}", workflow.nodes.len());
    println!("   Edges: {}", workflow.edges.len());
    println!();

    let context = parse_input(input)?;

    let mut config = RuntimeConfig::from_env();
    if let Some(pace_ms) = pace_ms {
        config.node_pacing_ms = pace_ms;
    }
    let registry = wfnodes::standard_registry(&config);
    let runtime = WorkflowRuntime::with_registry(Arc::new(registry), config);

    let cancellation = CancellationToken::new();
    if let Some(secs) = timeout_secs {
        let token = cancellation.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            token.cancel();
        });
    }

    let options = RunOptions::default()
        .with_context(context)
        .with_observer(Arc::new(print_log))
        .with_cancellation(cancellation);

    let result = runtime.execute(&workflow, options).await;

    println!();
    println!("📊 Execution Summary:");
    println!("   Execution ID: {}", result.execution_id);
    println!("   Status: {:?}", result.status);
    println!("   Executed: {}/{} nodes", result.executed_nodes, result.total_nodes);
    if let Some(ms) = result.duration_ms() {
        println!("   Duration: {}ms", ms);
    }

    if !result.is_success() {
        return Err(anyhow!("Workflow execution failed"));
    }
    Ok(())
}

fn validate_workflow(file: PathBuf) -> Result<()> {
    println!("🔍 Validating workflow: {}", file.display());

    let workflow = load_workflow(&file)?;
    let report = analyze(&workflow);

    println!("   Name: {}", workflow.name);
    println!("   Nodes: {}", workflow.nodes.len());
    println!("   Edges: {}", workflow.edges.len());
    println!("   Triggers: {}", report.triggers.join(", "));
    if report.has_cycle {
        println!("⚠️  Contains a cycle; revisited nodes will be skipped");
    }
    for edge in &report.dangling_edges {
        println!("⚠️  Edge {} points at a missing node", edge);
    }
    for node in &report.unreachable_nodes {
        println!("⚠️  Node {} is unreachable from any trigger", node);
    }
    for issue in &report.config_errors {
        println!("❌ Node {}: {}", issue.node_id, issue.message);
    }

    if report.triggers.is_empty() {
        return Err(anyhow!("No trigger node found in workflow"));
    }
    if !report.is_runnable() {
        return Err(anyhow!("Workflow has configuration errors"));
    }

    println!("✅ Workflow is valid");
    Ok(())
}

fn list_nodes() {
    println!("📦 Available Node Types:");
    println!();

    let registry = wfnodes::standard_registry(&RuntimeConfig::default());

    for node_type in registry.list_node_types() {
        println!("  • {}", node_type);
        if let Some(description) = registry.description(node_type) {
            println!("    {}", description);
        }
    }
}

fn list_templates() {
    println!("📚 Templates:");
    println!();
    for (index, template) in workflow_templates().iter().enumerate() {
        println!("  {}. {}", index, template.name);
        println!("     {}", template.description);
    }
}

fn create_from_template(index: usize, output: Option<PathBuf>) -> Result<()> {
    let draft = workflow_templates()
        .into_iter()
        .nth(index)
        .ok_or_else(|| anyhow!("No template #{}", index))?;
    let workflow = Workflow::from_draft(draft);

    let output = output.unwrap_or_else(|| PathBuf::from(export_file_name(&workflow)));
    std::fs::write(&output, export_workflow(&workflow)?)?;

    println!("✨ Created workflow \"{}\": {}", workflow.name, output.display());
    println!();
    println!("Run it with:");
    println!("  wf run --file {}", output.display());

    Ok(())
}
