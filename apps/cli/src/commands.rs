//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use assetforge_core::pipeline::{BuildOptions, BuildReporter, BuildSummary};
use assetforge_shared::{BuildResult, Locale, load_config, load_config_from};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// assetforge — compile the platform's front-end assets.
#[derive(Parser)]
#[command(
    name = "assetforge",
    version,
    about = "Compile scripts, styles, course content, icons, and the sitemap into one deployable tree.",
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
    /// Build all assets into the output tree.
    Build {
        /// Minify compiled scripts and styles.
        #[arg(long)]
        minify: bool,

        /// Keep running and rebuild affected units on file change.
        #[arg(long)]
        watch: bool,

        /// Locale(s) to fan out to (repeatable). Defaults to the configured set.
        #[arg(short, long = "locale")]
        locales: Vec<String>,

        /// Config file path (defaults to ./assetforge.toml).
        #[arg(short, long)]
        config: Option<PathBuf>,
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
    /// Write a default assetforge.toml into the working directory.
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
        0 => "assetforge=info",
        1 => "assetforge=debug",
        _ => "assetforge=trace",
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
        Command::Build {
            minify,
            watch,
            locales,
            config,
        } => cmd_build(minify, watch, &locales, config.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

async fn cmd_build(
    minify: bool,
    watch: bool,
    locales: &[String],
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    let config = match config_path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    let opts = BuildOptions {
        minify: minify || config.build.minify,
        watch,
        locales: locales.iter().map(|tag| Locale::new(tag.clone())).collect(),
    };

    info!(
        minify = opts.minify,
        watch = opts.watch,
        output = %config.paths.output_root.display(),
        "building assets"
    );

    let reporter = CliProgress::new(watch);
    assetforge_core::pipeline::build_assets(config, &opts, &reporter).await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
    watch: bool,
}

impl CliProgress {
    fn new(watch: bool) -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner, watch }
    }
}

impl BuildReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn unit_finished(&self, result: &BuildResult) {
        if result.success {
            self.spinner.println(format!(
                "  ✓ {} ({}ms)",
                result.unit_id,
                result.duration.as_millis()
            ));
        } else {
            self.spinner.println(format!(
                "  ✗ {} — {}",
                result.unit_id,
                result.error.as_deref().unwrap_or("unknown error")
            ));
        }
    }

    fn done(&self, summary: &BuildSummary) {
        self.spinner.finish_and_clear();

        println!();
        println!("  Build settled");
        println!("  Units:   {}", summary.results.len());
        println!("  Failed:  {}", summary.failed());
        println!("  Time:    {:.1}s", summary.elapsed.as_secs_f64());
        println!();

        if self.watch {
            println!("  Watching for changes — Ctrl-C to stop.");
            println!();
        }
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = assetforge_shared::init_config(std::path::Path::new("."))?;
    println!("wrote {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let rendered = toml::to_string_pretty(&config)?;
    println!("{rendered}");
    Ok(())
}
