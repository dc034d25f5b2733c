//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ceofinder_core::{Pipeline, RetryPolicy, RunControls, RunOptions, Runner};
use ceofinder_providers::anthropic::AnthropicProvider;
use ceofinder_providers::apollo::ApolloProvider;
use ceofinder_providers::duckduckgo::DuckDuckGoFinder;
use ceofinder_providers::gemini::GeminiProvider;
use ceofinder_providers::google_search::GoogleSearchProvider;
use ceofinder_providers::hunter::HunterProvider;
use ceofinder_providers::openai::OpenAiProvider;
use ceofinder_providers::rocketreach::RocketReachProvider;
use ceofinder_providers::{ContextSource, ProfileFinder, Provider, http_client};
use ceofinder_shared::{
    AppConfig, Credentials, ProgressEvent, RowOutcome, RunMode, config_file_path, init_config,
    load_config,
};
use ceofinder_table::Table;
use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::summary;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ceofinder — enrich a company spreadsheet with CEO names.
#[derive(Parser)]
#[command(
    name = "ceofinder",
    version,
    about = "Find company CEOs and their LinkedIn profiles from a CSV of company names.",
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
    /// Enrich a CSV of companies with CEO names and LinkedIn profiles.
    Run {
        /// Input CSV file with a company-name column.
        input: PathBuf,

        /// Output CSV path (defaults to `<input>_with_ceos.csv`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Which rows to process.
        #[arg(short, long, default_value = "missing")]
        mode: ModeArg,

        /// First row to process when resuming (zero-based).
        #[arg(long, default_value = "0")]
        start_index: usize,
    },

    /// Inspect a CSV: detected columns, row count, rows already resolved.
    Analyze {
        /// Input CSV file.
        input: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Row-selection mode for a run.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum ModeArg {
    /// Process every row, overwriting existing CEO fields.
    All,
    /// Process only rows without a usable CEO name.
    Missing,
    /// Start at --start-index, keeping earlier rows as they are.
    Resume,
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
        0 => "ceofinder=info",
        1 => "ceofinder=debug",
        _ => "ceofinder=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            input,
            out,
            mode,
            start_index,
        } => cmd_run(&input, out.as_deref(), mode, start_index).await,
        Command::Analyze { input } => cmd_analyze(&input).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

async fn cmd_run(
    input: &Path,
    out: Option<&Path>,
    mode: ModeArg,
    start_index: usize,
) -> Result<()> {
    let config = load_config()?;
    let credentials = Credentials::from_env(&config);
    credentials.validate(&config)?;

    let mut table = Table::from_path(input)?;
    let output_path = match out {
        Some(path) => path.to_path_buf(),
        None => default_output_path(input, &config.defaults.output_suffix),
    };

    let run_mode = match mode {
        ModeArg::All => RunMode::All,
        ModeArg::Missing => RunMode::MissingOnly,
        ModeArg::Resume => RunMode::Resume { start_index },
    };

    // Interrupted runs leave a partial output file behind; pick up its
    // answers instead of paying for them again.
    if !matches!(run_mode, RunMode::All) && output_path.exists() {
        match Table::from_path(&output_path) {
            Ok(previous) => {
                let merged = table.merge_previous(&previous);
                if merged > 0 {
                    info!(merged, "reused results from {}", output_path.display());
                }
            }
            Err(e) => warn!(error = %e, "could not read previous output, ignoring it"),
        }
    }

    let pipeline = build_pipeline(&config, &credentials)?;
    info!(
        rows = table.len(),
        providers = ?pipeline.provider_names(),
        keys = credentials.active_count(),
        output = %output_path.display(),
        "starting run"
    );

    let controls = RunControls::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let runner = Runner::new(
        pipeline,
        RunOptions {
            mode: run_mode,
            output_path: output_path.clone(),
            checkpoint_every: config.defaults.checkpoint_every,
            auth_failure_threshold: config.defaults.auth_failure_threshold,
        },
        controls.clone(),
        tx,
    );

    // Ctrl-C requests a cooperative cancel; the in-flight row finishes and
    // partial results are saved.
    let signal_controls = controls.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling after the current row...");
            signal_controls.cancel();
        }
    });

    let display = tokio::spawn(show_progress(rx, table.len() as u64));

    let state = runner.run(&mut table).await?;
    drop(runner);
    display.await?;

    summary::print_run_summary(&table, &state, &output_path);
    Ok(())
}

/// `companies.csv` -> `companies_with_ceos.csv`, next to the input.
fn default_output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}{suffix}.csv"))
}

/// Assemble the provider stack in priority order: contact databases first
/// (they return verified people), then the language models. Providers
/// without a configured key are left out.
fn build_pipeline(config: &AppConfig, credentials: &Credentials) -> Result<Pipeline> {
    let mut builder = Pipeline::builder()
        .retry(RetryPolicy::from_defaults(&config.defaults))
        .rate_limit(Duration::from_millis(config.defaults.rate_limit_ms))
        .website_client(http_client()?);

    if let Some(key) = &credentials.hunter {
        builder = builder.provider(Arc::new(HunterProvider::new(key.clone())?));
    }
    if let Some(key) = &credentials.apollo {
        builder = builder.provider(Arc::new(ApolloProvider::new(key.clone())?));
    }
    if let Some(key) = &credentials.rocketreach {
        builder = builder.provider(Arc::new(RocketReachProvider::new(key.clone())?));
    }
    if let Some(key) = &credentials.anthropic {
        builder = builder.provider(Arc::new(AnthropicProvider::new(key.clone())?));
    }
    if let Some(key) = &credentials.openai {
        builder = builder.provider(Arc::new(OpenAiProvider::new(key.clone())?));
    }
    if let Some(key) = &credentials.gemini {
        builder = builder.provider(Arc::new(GeminiProvider::new(key.clone())?));
    }

    // Google Custom Search both gathers prompt context and finds LinkedIn
    // profiles; without its keys, DuckDuckGo's HTML results fill both roles.
    match (&credentials.google_search, &credentials.google_search_cx) {
        (Some(key), Some(cx)) => {
            let google = Arc::new(GoogleSearchProvider::new(key.clone(), cx.clone())?);
            builder = builder
                .provider(google.clone() as Arc<dyn Provider>)
                .context_source(google.clone() as Arc<dyn ContextSource>)
                .profile_finder(google as Arc<dyn ProfileFinder>);
        }
        _ => {
            warn!("no Google Search credentials, falling back to DuckDuckGo");
            let ddg = Arc::new(DuckDuckGoFinder::new()?);
            builder = builder
                .context_source(ddg.clone() as Arc<dyn ContextSource>)
                .profile_finder(ddg as Arc<dyn ProfileFinder>);
        }
    }

    Ok(builder.build())
}

/// Consume progress events and render an indicatif bar until the channel
/// closes.
async fn show_progress(mut rx: mpsc::UnboundedReceiver<ProgressEvent>, total: u64) {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    while let Some(event) = rx.recv().await {
        match event {
            ProgressEvent::Started { state } => {
                bar.set_length(state.total as u64);
            }
            ProgressEvent::Row {
                company, outcome, source, ..
            } => {
                bar.inc(1);
                let note = match outcome {
                    RowOutcome::Found => {
                        format!("{company}: found ({})", source.as_deref().unwrap_or("?"))
                    }
                    RowOutcome::AlreadyHadCeo => format!("{company}: kept"),
                    RowOutcome::NotFound => format!("{company}: not found"),
                };
                bar.set_message(note);
            }
            ProgressEvent::ProviderDisabled { provider, reason } => {
                bar.println(format!("  provider '{provider}' disabled: {reason}"));
            }
            ProgressEvent::Finished { .. } => {
                bar.finish_and_clear();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// analyze
// ---------------------------------------------------------------------------

async fn cmd_analyze(input: &Path) -> Result<()> {
    let table = Table::from_path(input)?;
    let columns = table.columns();

    let records = table.records();
    let resolved = records.iter().filter(|r| r.has_ceo()).count();
    let unnamed = records.iter().filter(|r| r.company.trim().is_empty()).count();

    println!();
    println!("  File:     {}", input.display());
    println!("  Rows:     {}", table.len());
    println!("  Columns:  {}", table.headers().join(", "));
    println!();
    println!("  Company column:  {}", table.headers()[columns.company]);
    match columns.website {
        Some(idx) => println!("  Website column:  {}", table.headers()[idx]),
        None => println!("  Website column:  (none detected)"),
    }
    println!();
    println!("  Rows with a CEO:     {resolved}");
    println!("  Rows still missing:  {}", table.len() - resolved);
    if unnamed > 0 {
        println!("  Rows without a company name: {unnamed}");
    }
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    println!("# {}", config_file_path()?.display());
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");

    let credentials = Credentials::from_env(&config);
    println!("# resolved API keys: {} of 8 set", credentials.active_count());
    Ok(())
}
