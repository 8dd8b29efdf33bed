//! moodlebot CLI — onboarding, status, and direct tool invocation.
//!
//! Usage:
//!   moodlebot onboard             — Create a default configuration
//!   moodlebot status              — Show current configuration and health
//!   moodlebot tools               — List the tools exposed to the agent
//!   moodlebot call <tool> --args  — Execute a single tool directly
//!
//! The conversational front-end lives in the external agent framework; this
//! binary exists to configure the Moodle connection and smoke-test the tool
//! surface without going through an LLM.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::sync::Arc;

use moodlebot_core::config::Config;
use moodlebot_core::moodle::MoodleClient;
use moodlebot_core::tools::{register_all, ToolRegistry};

#[derive(Parser)]
#[command(
    name = "moodlebot",
    version,
    about = "Moodle administration tools for LLM agents",
    long_about = "moodlebot — a tool surface that lets an LLM agent administer a Moodle site.\n\nUser CRUD, course management, enrollment, and grade lookup, with name-to-ID resolution built in."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or reset the default configuration
    Onboard,

    /// Show configuration status and health
    Status,

    /// List the tools exposed to the agent
    Tools,

    /// Execute a single tool directly (smoke-testing)
    Call {
        /// Tool name (e.g., "get_user_info")
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Onboard) => cmd_onboard()?,
        Some(Commands::Status) => cmd_status()?,
        Some(Commands::Tools) => cmd_tools()?,
        Some(Commands::Call { tool, args }) => cmd_call(&tool, &args).await?,
        None => cmd_status()?,
    }

    Ok(())
}

// ── Shared Setup ────────────────────────────────────────────────────

fn validate_config(config: &Config) -> Result<()> {
    if let Err(errors) = config.validate() {
        eprintln!("\n  \x1b[31m❌ Configuration errors:\x1b[0m");
        for e in &errors {
            eprintln!("     • {}", e);
        }
        eprintln!();
        anyhow::bail!("Fix the above {} error(s) in config.json or the environment", errors.len());
    }
    Ok(())
}

fn setup_registry(config: &Config) -> Result<ToolRegistry> {
    let client = Arc::new(MoodleClient::new(config.moodle.clone())?);
    let mut tools = ToolRegistry::new();
    register_all(&mut tools, client);
    Ok(tools)
}

// ── Onboard Command ─────────────────────────────────────────────────

fn cmd_onboard() -> Result<()> {
    let path = Config::write_default_template()?;
    println!();
    println!("  ✅ Configuration created at:");
    println!("     {}", path.display());
    println!();
    println!("  Next steps:");
    println!("  1. Edit the config file with your Moodle URL and admin credentials");
    println!("  2. Run `moodlebot status` to verify the connection settings");
    println!();
    Ok(())
}

// ── Status Command ──────────────────────────────────────────────────

fn cmd_status() -> Result<()> {
    let config_path = Config::default_path();
    let config = Config::load()?;

    println!();
    println!("  moodlebot status");
    println!("  ─────────────────────────────────────");

    if config_path.exists() {
        println!("  Config:    {}", config_path.display());
    } else {
        println!("  Config:    (no file — environment only)");
    }

    match config.validate() {
        Ok(()) => {
            println!("  Moodle:    ✅ {}", config.moodle.rest_url());
            println!("  Service:   {}", config.moodle.service_shortname);
            println!("  Admin:     {}", config.moodle.admin_username);
        }
        Err(errors) => {
            println!("  Moodle:    ❌ Incomplete configuration");
            for e in &errors {
                println!("     • {}", e);
            }
            println!();
            println!("  Run `moodlebot onboard` or set the MOODLE_* environment variables.");
            println!();
            return Ok(());
        }
    }

    let tools = setup_registry(&config)?;
    println!("  Tools:     {} registered", tools.len());

    println!();
    Ok(())
}

// ── Tools Command ───────────────────────────────────────────────────

fn cmd_tools() -> Result<()> {
    let config = Config::load()?;
    let tools = setup_registry(&config)?;

    let mut names = tools.names();
    names.sort_unstable();

    println!();
    println!("  {} tools exposed to the agent:", names.len());
    println!();
    for name in names {
        if let Some(tool) = tools.get(name) {
            println!("  {name}");
            println!("      {}", tool.description());
        }
    }
    println!();
    Ok(())
}

// ── Call Command ────────────────────────────────────────────────────

async fn cmd_call(tool: &str, args: &str) -> Result<()> {
    let config = Config::load()?;
    validate_config(&config)?;

    let tools = setup_registry(&config)?;
    if !tools.has(tool) {
        let mut names = tools.names();
        names.sort_unstable();
        anyhow::bail!("Unknown tool '{}'. Available: {}", tool, names.join(", "));
    }

    let args: HashMap<String, serde_json::Value> = serde_json::from_str(args)
        .map_err(|e| anyhow::anyhow!("--args must be a JSON object: {}", e))?;

    let result = tools.execute(tool, args).await;
    println!("{result}");
    Ok(())
}
