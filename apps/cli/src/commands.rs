//! CLI command definitions, routing, and tracing setup.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use deepcut_core::{Pipeline, ProgressEmitter, ProgressEvent, RunOutcome, STAGES};
use deepcut_generation::OpenAiClient;
use deepcut_server::{AppState, mailer_from_config};
use deepcut_shared::{
    AppConfig, GenerationRequest, IdeaId, Secrets, expand_home, init_config, load_config,
};
use deepcut_storage::{IdeaStore, Storage};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// DeepCut: one topic in, a documentary research package out.
#[derive(Parser)]
#[command(
    name = "deepcut",
    version,
    about = "Generate documentary research packages from a single topic.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Start the HTTP API.
    Serve {
        /// Address to bind (defaults to `server.bind` from config).
        #[arg(long)]
        bind: Option<String>,
    },

    /// Generate a research package for a topic.
    Research {
        /// Documentary topic.
        topic: String,

        /// Optional style or tone, e.g. "noir true crime".
        #[arg(short, long)]
        style: Option<String>,
    },

    /// Pick today's topic automatically and generate its package.
    Daily {
        /// Skip the digest email even when email is configured.
        #[arg(long)]
        no_email: bool,
    },

    /// List stored ideas, newest first.
    List {
        /// Case-insensitive substring match on the topic.
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Print a stored idea as JSON.
    Show {
        /// Idea ID.
        id: String,
    },

    /// Delete a stored idea.
    Delete {
        /// Idea ID.
        id: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "deepcut=info",
        1 => "deepcut=debug,tower_http=debug",
        _ => "deepcut=trace,tower_http=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve { bind } => cmd_serve(bind).await,
        Command::Research { topic, style } => cmd_research(&topic, style).await,
        Command::Daily { no_email } => cmd_daily(!no_email).await,
        Command::List { search } => cmd_list(search.as_deref()).await,
        Command::Show { id } => cmd_show(&id).await,
        Command::Delete { id } => cmd_delete(&id).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

async fn open_store(config: &AppConfig) -> Result<Storage> {
    let db_path = expand_home(&config.storage.db_path)?;
    Ok(Storage::open(&db_path).await?)
}

async fn build_pipeline(config: &AppConfig, secrets: &Secrets) -> Result<Pipeline> {
    let store = open_store(config).await?;
    let client = OpenAiClient::new(&config.generation, secrets.generation_api_key.clone())?;
    info!(model = client.model(), "generation client ready");
    Ok(Pipeline::new(Arc::new(client), Arc::new(store)))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_serve(bind: Option<String>) -> Result<()> {
    let config = load_config()?;
    let secrets = Secrets::resolve(&config)?;
    let addr = bind.unwrap_or_else(|| config.server.bind.clone());

    let state = AppState::from_config(&config, &secrets).await?;
    deepcut_server::serve(state, &addr)
        .await
        .map_err(|e| eyre!("server on {addr} failed: {e}"))
}

async fn cmd_research(topic: &str, style: Option<String>) -> Result<()> {
    let request = GenerationRequest::new(topic, style)?;
    let config = load_config()?;
    let secrets = Secrets::resolve(&config)?;
    let pipeline = build_pipeline(&config, &secrets).await?;

    info!(topic = request.topic(), "generating research package");

    let progress = CliProgress::new();
    let outcome = pipeline.run(&request, &progress).await?;
    print_outcome(&outcome);
    Ok(())
}

async fn cmd_daily(email: bool) -> Result<()> {
    let config = load_config()?;
    let secrets = Secrets::resolve(&config)?;
    let pipeline = build_pipeline(&config, &secrets).await?;

    let progress = CliProgress::new();
    progress.spinner.set_message("Choosing today's topic...");
    let outcome = pipeline.run_automated(&progress).await?;
    print_outcome(&outcome);

    if !email {
        return Ok(());
    }
    match mailer_from_config(&config, &secrets)? {
        Some(mailer) => match mailer.send_digest(&outcome).await {
            Ok(()) => println!("  Digest emailed to {}", config.email.to.join(", ")),
            Err(e) => warn!(error = %e, "daily digest email failed"),
        },
        None => info!("email not configured, digest skipped"),
    }
    Ok(())
}

async fn cmd_list(search: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config).await?;
    let ideas = store.get_all_ideas(search).await?;

    if ideas.is_empty() {
        println!("No ideas found.");
        return Ok(());
    }

    for idea in &ideas {
        let marker = if idea.created_via_automation { "auto" } else { "    " };
        println!(
            "{}  {}  {}  {}",
            idea.id,
            idea.created_at.format("%Y-%m-%d %H:%M"),
            marker,
            idea.research_data.display_title(&idea.topic),
        );
    }
    println!();
    println!("  {} idea(s)", ideas.len());
    Ok(())
}

async fn cmd_show(id: &str) -> Result<()> {
    let id: IdeaId = id.parse().map_err(|_| eyre!("invalid idea ID '{id}'"))?;
    let config = load_config()?;
    let store = open_store(&config).await?;
    let idea = store
        .get_idea_by_id(&id)
        .await?
        .ok_or_else(|| eyre!("idea {id} not found"))?;
    println!("{}", serde_json::to_string_pretty(&idea)?);
    Ok(())
}

async fn cmd_delete(id: &str) -> Result<()> {
    let id: IdeaId = id.parse().map_err(|_| eyre!("invalid idea ID '{id}'"))?;
    let config = load_config()?;
    let store = open_store(&config).await?;
    if !store.delete_idea(&id).await? {
        return Err(eyre!("idea {id} not found"));
    }
    println!("Deleted idea {id}");
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn print_outcome(outcome: &RunOutcome) {
    println!();
    println!("  Research package ready!");
    println!("  ID:     {}", outcome.id);
    println!("  Topic:  {}", outcome.topic);
    println!("  Title:  {}", outcome.top_title());
    let raw = outcome.package.fallback_sections();
    if !raw.is_empty() {
        let names: Vec<&str> = raw.iter().map(|k| k.as_str()).collect();
        println!("  Unstructured sections: {}", names.join(", "));
    }
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress emitter
// ---------------------------------------------------------------------------

/// Terminal progress using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressEmitter for CliProgress {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Generating { section, label } => {
                let step = STAGES
                    .iter()
                    .position(|s| s.key == section)
                    .map_or(0, |i| i + 1);
                self.spinner
                    .set_message(format!("[{step}/{}] {label}", STAGES.len()));
            }
            ProgressEvent::Complete { section, data } => {
                let note = if data.is_fallback() { " (raw text)" } else { "" };
                self.spinner.println(format!("  ✓ {section}{note}"));
            }
            ProgressEvent::Done { .. } => self.spinner.finish_and_clear(),
            ProgressEvent::Error { error } => {
                self.spinner.finish_and_clear();
                eprintln!("  ✗ {error}");
            }
        }
    }
}
