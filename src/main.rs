use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use scriptscout::{
    cache::CachedFile,
    config::Config,
    database::{DatabaseSource, VulnerabilityDatabase},
    fetch::Fetcher,
    fingerprint::PageFingerprinter,
    output::{OutputFormat, Reporter, ScanLog, ScanSummary},
    scan::{read_subdomains, Outcome, ScanOrchestrator},
};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Exit codes for CI integration
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
    pub const FINDINGS: u8 = 2;
}

#[derive(Parser)]
#[command(name = "scriptscout")]
#[command(
    author,
    version,
    about = "Find JavaScript files in subdomains, fingerprint their stack, and flag vulnerable libraries"
)]
struct Cli {
    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a single subdomain or a list of subdomains
    Scan {
        /// Specify a single domain to check
        #[arg(short, long, conflicts_with = "file")]
        domain: Option<String>,

        /// File containing list of subdomains to check (default: subdomains.txt)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Append the report to this log file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(long)]
        format: Option<String>,

        /// Number of subdomains scanned concurrently
        #[arg(short, long)]
        workers: Option<usize>,

        /// Location of the cached vulnerability database
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Download the vulnerability database even if the cached copy is fresh
        #[arg(long)]
        refresh_db: bool,

        /// Do not show a progress bar
        #[arg(long)]
        no_progress: bool,

        /// Exit with code 2 if any vulnerable script is found
        #[arg(long)]
        fail_on_findings: bool,
    },

    /// Download the latest vulnerability database
    UpdateDb {
        /// Location of the cached vulnerability database
        #[arg(long)]
        db_path: Option<PathBuf>,
    },

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Delete the cached vulnerability database
    ClearCache {
        /// Location of the cached vulnerability database
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
}

struct ScanArgs {
    domain: Option<String>,
    file: Option<PathBuf>,
    output: Option<PathBuf>,
    format: Option<String>,
    workers: Option<usize>,
    db_path: Option<PathBuf>,
    refresh_db: bool,
    no_progress: bool,
    fail_on_findings: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<u8> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);
    let config = Config::load_from(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;

    match cli.command {
        Commands::Scan {
            domain,
            file,
            output,
            format,
            workers,
            db_path,
            refresh_db,
            no_progress,
            fail_on_findings,
        } => {
            let args = ScanArgs {
                domain,
                file,
                output,
                format,
                workers,
                db_path,
                refresh_db,
                no_progress,
                fail_on_findings,
            };
            run_scan(&config, args).await
        }
        Commands::UpdateDb { db_path } => {
            let source = database_source(&config, db_path);
            let database = VulnerabilityDatabase::update(&source).await?;
            println!(
                "Downloaded {} signatures for {} libraries to {}",
                database.len(),
                database.libraries().len(),
                source.cache.path().display()
            );
            Ok(exit_codes::SUCCESS)
        }
        Commands::Config { init, path } => {
            handle_config(&config_path, init, path)?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::ClearCache { db_path } => {
            let source = database_source(&config, db_path);
            if source.cache.remove()? {
                println!("Removed {}", source.cache.path().display());
            } else {
                println!("Cache already empty.");
            }
            Ok(exit_codes::SUCCESS)
        }
    }
}

fn database_source(config: &Config, db_path: Option<PathBuf>) -> DatabaseSource {
    let path = db_path.unwrap_or_else(|| config.database_path());
    DatabaseSource::new(
        CachedFile::with_ttl_hours(path, config.database_ttl_hours),
        config.database_url.clone(),
    )
}

async fn run_scan(config: &Config, args: ScanArgs) -> Result<u8> {
    let format_str = args.format.as_deref().unwrap_or(&config.default_format);
    let format = OutputFormat::from_str(format_str).map_err(|e| anyhow::anyhow!(e))?;

    let log = args
        .output
        .as_ref()
        .map(ScanLog::open)
        .transpose()
        .context("Failed to open output log")?;

    let source = database_source(config, args.db_path);
    let database = VulnerabilityDatabase::load_or_empty(&source, args.refresh_db).await;
    let fetcher = Fetcher::new(config.fetcher_config()).context("Failed to build HTTP client")?;

    let mut orchestrator = ScanOrchestrator::new(
        Arc::new(fetcher),
        Arc::new(database),
        Arc::new(PageFingerprinter),
    )
    .with_workers(args.workers.unwrap_or(config.workers));
    if let Some(log) = &log {
        orchestrator = orchestrator.with_log(log.clone());
    }

    let mut summary = ScanSummary::default();

    if let Some(domain) = args.domain {
        let outcome = orchestrator.scan_isolated(domain.trim().to_string()).await;
        summary.record(&outcome);
        if let Outcome::Reported(result) = &outcome {
            Reporter::new(format, log).report(result)?;
        }
    } else {
        let path = args.file.unwrap_or_else(|| config.default_input.clone());
        let subdomains = match read_subdomains(&path) {
            Ok(subdomains) => subdomains,
            Err(e) => {
                if let Some(log) = &log {
                    log.record(&e.to_string());
                }
                return Err(e.into());
            }
        };

        if subdomains.is_empty() {
            let message = "No subdomains found in the file.";
            eprintln!("{}", message);
            if let Some(log) = &log {
                log.record(message);
            }
            return Ok(exit_codes::SUCCESS);
        }

        let show_progress =
            !args.no_progress && format == OutputFormat::Text && std::io::stdout().is_terminal();
        let progress = show_progress.then(|| progress_bar(subdomains.len() as u64));

        let mut reporter = Reporter::new(format, log);
        if let Some(pb) = &progress {
            reporter = reporter.with_progress(pb.clone());
        }

        let mut outcomes = pin!(orchestrator.scan_stream(subdomains));
        while let Some(outcome) = outcomes.next().await {
            summary.record(&outcome);
            if let Outcome::Reported(result) = &outcome {
                if let Err(e) = reporter.report(result) {
                    tracing::warn!("Failed to report {}: {:#}", result.subdomain, e);
                }
            }
            if let Some(pb) = &progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        if format == OutputFormat::Text {
            println!();
            println!("{}", summary.render());
        }
    }

    if args.fail_on_findings && summary.findings > 0 {
        Ok(exit_codes::FINDINGS)
    } else {
        Ok(exit_codes::SUCCESS)
    }
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} Scanning subdomains...")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn handle_config(config_path: &Path, init: bool, show_path: bool) -> Result<()> {
    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        Config::default().save_to(config_path)?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    // Show current config
    if config_path.exists() {
        let content = std::fs::read_to_string(config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'scriptscout config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}
