//! Conduit - MCP server installer for AI coding agents
//!
//! Usage:
//!   conduit install ./servers/echo          # Install into detected agents
//!   conduit install registry:acme/echo --agent codex --scope user
//!   conduit uninstall echo                   # Remove everywhere it was installed
//!   conduit list                             # Servers per agent
//!   conduit agents                           # Known agents and where they store config
//!   conduit lock                             # Lock file entries

mod interactive;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use conduit_core::client::{ClientContext, ClientRegistry};
use conduit_core::commands::{
    AgentListing, AgentOutcome, AgentStatus, CommandContext, InstallCommand, InstallOptions,
    InstallReport, ListCommand, ListOptions, LockChange, UninstallCommand, UninstallOptions,
    UninstallReport,
};
use conduit_core::config::{ConduitSettings, paths};
use conduit_core::lockfile::LockStore;
use conduit_core::source::{SourceResolver, SourceSpec};
use conduit_core::types::Scope;

use crate::interactive::{InteractiveFlow, PrefilledOptions};

#[derive(Parser)]
#[command(name = "conduit")]
#[command(about = "Install MCP servers into AI coding agents", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install servers from a source into agent configs
    Install(InstallArgs),

    /// Remove a server from agent configs
    #[command(alias = "rm")]
    Uninstall(UninstallArgs),

    /// List servers installed in agent configs
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        target: TargetArgs,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show known agents, detection state and config locations
    Agents {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show lock file entries
    Lock {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[derive(Args)]
struct TargetArgs {
    /// Target agent (repeatable); defaults to detected agents
    #[arg(long = "agent", short = 'a', value_name = "AGENT")]
    agents: Vec<String>,

    /// Configuration scope (project or user)
    #[arg(long, short)]
    scope: Option<Scope>,
}

#[derive(Args)]
struct InstallArgs {
    /// Source: a path, registry:<id>, github:<owner>/<repo>[@ref] or a git URL
    ///
    /// Required unless --interactive is used
    source: Option<String>,

    #[command(flatten)]
    target: TargetArgs,

    /// Install under this name instead of the server's own
    #[arg(long, short)]
    name: Option<String>,

    /// Interactive mode - prompts for missing options
    #[arg(short, long)]
    interactive: bool,

    /// Skip the confirmation prompt in interactive mode
    #[arg(short = 'y', long)]
    yes: bool,

    /// Output format
    #[arg(short = 'o', long, default_value = "table")]
    format: OutputFormat,
}

#[derive(Args)]
struct UninstallArgs {
    /// Server id or installed name
    key: String,

    #[command(flatten)]
    target: TargetArgs,

    /// Output format
    #[arg(short = 'o', long, default_value = "table")]
    format: OutputFormat,
}

/// Settings and services shared by every subcommand.
struct App {
    settings: ConduitSettings,
    context: CommandContext,
}

impl App {
    fn load() -> Result<Self> {
        let settings = ConduitSettings::load()?;
        let client_ctx = ClientContext::from_env().context("Failed to locate home directory")?;
        let working_dir = std::env::current_dir().context("Failed to read current directory")?;
        let lock_path = settings.lock_path()?;
        tracing::debug!(
            registry = %settings.registry_url,
            lock = %lock_path.display(),
            working_dir = %working_dir.display(),
            "Loaded settings"
        );
        let context = CommandContext::new(
            ClientRegistry::with_default_clients(client_ctx),
            LockStore::new(lock_path),
            working_dir,
        );
        Ok(Self { settings, context })
    }

    fn scope(&self, target: &TargetArgs) -> Scope {
        target.scope.unwrap_or(self.settings.default_scope)
    }

    fn agents(&self, target: &TargetArgs) -> Vec<String> {
        if target.agents.is_empty() {
            self.settings.default_agents.clone()
        } else {
            target.agents.clone()
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", style("✗").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "conduit=debug,conduit_core=debug,info"
    } else {
        "conduit=info,conduit_core=info,warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(command: Commands) -> Result<ExitCode> {
    let app = App::load()?;
    match command {
        Commands::Install(args) => run_install(&app, args),
        Commands::Uninstall(args) => run_uninstall(&app, args),
        Commands::List { target, format } => {
            let options = ListOptions::new(app.scope(&target)).with_agents(app.agents(&target));
            let listings = ListCommand::new(&app.context).execute(&options)?;
            match format {
                OutputFormat::Table => print_listings(&listings),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listings)?),
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Agents { format } => {
            run_agents(&app, format)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Lock { format } => {
            run_lock(&app, format)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_install(app: &App, args: InstallArgs) -> Result<ExitCode> {
    let (source, options) = if args.interactive {
        let prefilled = PrefilledOptions {
            source: args.source.clone(),
            scope: args.target.scope,
            agents: (!args.target.agents.is_empty()).then(|| args.target.agents.clone()),
            name: args.name.clone(),
            yes: args.yes,
        };
        let result = InteractiveFlow::new(app.context.registry(), prefilled).collect()?;
        if !result.confirmed {
            println!("Installation cancelled.");
            return Ok(ExitCode::SUCCESS);
        }
        (result.source, result.options)
    } else {
        let source = args
            .source
            .clone()
            .ok_or_else(|| anyhow::anyhow!("Missing required argument: source"))?;
        let mut options =
            InstallOptions::new(app.scope(&args.target)).with_agents(app.agents(&args.target));
        if let Some(name) = &args.name {
            options = options.with_name(name);
        }
        (source, options)
    };

    let spec = SourceSpec::parse(&source)?;
    if spec.is_remote() {
        tracing::info!(%source, "Fetching remote source");
    }
    let resolver = SourceResolver::new(&app.settings.registry_url, paths::cache_dir()?);
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let resolved = runtime
        .block_on(resolver.resolve(&spec))
        .with_context(|| format!("Failed to resolve source '{}'", source))?;

    let report = InstallCommand::new(&app.context).execute(&resolved, &options)?;
    match args.format {
        OutputFormat::Table => print_install_report(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(exit_code(report.all_failed()))
}

fn run_uninstall(app: &App, args: UninstallArgs) -> Result<ExitCode> {
    let options = UninstallOptions::new(&args.key, app.scope(&args.target))
        .with_agents(app.agents(&args.target));
    let report = UninstallCommand::new(&app.context).execute(&options)?;
    match args.format {
        OutputFormat::Table => print_uninstall_report(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(exit_code(report.all_failed()))
}

fn run_agents(app: &App, format: OutputFormat) -> Result<()> {
    let registry = app.context.registry();
    let detected: Vec<&str> = registry.detect_installed().iter().map(|c| c.id()).collect();
    let working_dir = app.context.working_dir();

    let rows: Vec<serde_json::Value> = registry
        .all()
        .iter()
        .map(|agent| {
            let paths: serde_json::Map<String, serde_json::Value> = agent
                .supported_scopes()
                .iter()
                .filter_map(|scope| {
                    let path = agent.config_path(*scope, working_dir).ok()?;
                    Some((scope.to_string(), path.display().to_string().into()))
                })
                .collect();
            serde_json::json!({
                "id": agent.id(),
                "name": agent.display_name(),
                "detected": detected.contains(&agent.id()),
                "configPaths": paths,
            })
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Table => {
            println!("  {:<16} {:<16} {:<9} Config", "Id", "Name", "Detected");
            println!("  {}", "-".repeat(70));
            for row in &rows {
                let detected = if row["detected"].as_bool().unwrap_or(false) {
                    style("yes").green()
                } else {
                    style("no").dim()
                };
                let paths = row["configPaths"]
                    .as_object()
                    .map(|m| {
                        m.iter()
                            .map(|(scope, path)| format!("{}: {}", scope, path.as_str().unwrap_or("")))
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .unwrap_or_default();
                println!(
                    "  {:<16} {:<16} {:<9} {}",
                    row["id"].as_str().unwrap_or(""),
                    row["name"].as_str().unwrap_or(""),
                    detected,
                    paths
                );
            }
        }
    }
    Ok(())
}

fn run_lock(app: &App, format: OutputFormat) -> Result<()> {
    let entries = app.context.lock_store().list_entries();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Table => {
            println!("Lock file: {}", app.context.lock_store().path().display());
            if entries.is_empty() {
                println!("No servers installed.");
                return Ok(());
            }
            println!(
                "  {:<30} {:<10} {:<12} {:<17} Targets",
                "Server", "Source", "Version", "Hash"
            );
            println!("  {}", "-".repeat(90));
            for entry in &entries {
                let targets = entry
                    .targets
                    .iter()
                    .map(|t| format!("{}/{}", t.agent, t.scope))
                    .collect::<Vec<_>>()
                    .join(", ");
                println!(
                    "  {:<30} {:<10} {:<12} {:<17} {}",
                    truncate(&entry.server_id, 30),
                    entry.source.kind.as_str(),
                    truncate(entry.version.as_deref().unwrap_or("-"), 12),
                    entry.metadata_hash,
                    targets
                );
            }
        }
    }
    Ok(())
}

fn print_install_report(report: &InstallReport) {
    for server in &report.servers {
        println!("{}", style(&server.server_id).bold());
        print_outcomes(&server.outcomes);
        print_lock_change(&server.lock);
    }
}

fn print_uninstall_report(report: &UninstallReport) {
    let title = match &report.server_id {
        Some(id) if id != &report.key => format!("{} ({})", report.key, id),
        _ => report.key.clone(),
    };
    println!("{}", style(title).bold());
    print_outcomes(&report.outcomes);
    print_lock_change(&report.lock);
}

fn print_outcomes(outcomes: &[AgentOutcome]) {
    for outcome in outcomes {
        let line = match &outcome.status {
            AgentStatus::Installed { name, replaced } => format!(
                "{} {} [{}]: installed as '{}'{}",
                style("✓").green(),
                outcome.agent,
                outcome.scope,
                name,
                if *replaced { " (replaced)" } else { "" }
            ),
            AgentStatus::Removed { name } => format!(
                "{} {} [{}]: removed '{}'",
                style("✓").green(),
                outcome.agent,
                outcome.scope,
                name
            ),
            AgentStatus::NotPresent { name } => format!(
                "{} {} [{}]: '{}' not present",
                style("•").dim(),
                outcome.agent,
                outcome.scope,
                name
            ),
            AgentStatus::Skipped { reason } => format!(
                "{} {} [{}]: skipped, {}",
                style("⚠").yellow(),
                outcome.agent,
                outcome.scope,
                reason
            ),
            AgentStatus::Failed { error } => format!(
                "{} {} [{}]: {}",
                style("✗").red(),
                outcome.agent,
                outcome.scope,
                error
            ),
        };
        println!("  {}", line);
    }
}

fn print_lock_change(change: &LockChange) {
    let text = match change {
        LockChange::Created => "lock entry created".to_string(),
        LockChange::Unchanged => "lock entry up to date".to_string(),
        LockChange::Changed => "lock entry updated, server definition changed".to_string(),
        LockChange::Updated => "lock entry targets updated".to_string(),
        LockChange::Removed => "lock entry removed".to_string(),
        LockChange::Untouched => return,
        LockChange::Failed { error } => format!("{} lock file not updated: {}", style("⚠").yellow(), error),
    };
    println!("  {}", style(text).dim());
}

fn print_listings(listings: &[AgentListing]) {
    for listing in listings {
        let path = listing
            .config_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        println!(
            "{} [{}] {}",
            style(&listing.display_name).bold(),
            listing.scope,
            style(path).dim()
        );
        if let Some(error) = &listing.error {
            println!("  {} {}", style("✗").red(), error);
            continue;
        }
        if listing.servers.is_empty() {
            println!("  (none)");
            continue;
        }
        for server in &listing.servers {
            let target = match server.server.transport.url() {
                Some(url) => url.to_string(),
                None => match &server.server.transport {
                    conduit_core::mcp::Transport::Stdio { command, args, .. } => {
                        std::iter::once(command.as_str())
                            .chain(args.iter().map(String::as_str))
                            .collect::<Vec<_>>()
                            .join(" ")
                    }
                    _ => String::new(),
                },
            };
            let managed = match &server.lock_entry {
                Some(id) => style(format!("({})", id)).dim().to_string(),
                None => String::new(),
            };
            println!(
                "  {:<20} {:<6} {} {}",
                truncate(&server.name, 20),
                server.server.transport.kind().as_str(),
                truncate(&target, 50),
                managed
            );
        }
    }
}

fn exit_code(all_failed: bool) -> ExitCode {
    if all_failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}
