//! Honeycomb-Sitemap main entry point
//!
//! This is the command-line interface for the sitemap generator.

use anyhow::{bail, Context};
use clap::Parser;
use honeycomb_sitemap::config::{load_config_with_hash, Config};
use honeycomb_sitemap::output::print_summary;
use honeycomb_sitemap::pipeline::{run_combine, run_generate, run_partials};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Honeycomb-Sitemap: sitemap generator for digital collections
///
/// Crawls the collections API and writes one sitemap per collection plus a
/// sitemap index, skipping collections disallowed by robots.txt. Runs with
/// built-in defaults when no configuration file is given.
#[derive(Parser, Debug)]
#[command(name = "honeycomb-sitemap")]
#[command(version)]
#[command(about = "Sitemap generator for digital collections", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Write numbered fragment files instead of per-collection sitemaps
    #[arg(long, conflicts_with_all = ["combine", "dry_run"])]
    partials: bool,

    /// Concatenate fragment files into one combined sitemap and exit
    #[arg(long, conflicts_with_all = ["partials", "dry_run"])]
    combine: bool,

    /// Validate config and show what would be done without fetching anything
    #[arg(long, conflicts_with_all = ["partials", "combine"])]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.combine {
        handle_combine(&config).await?;
    } else {
        handle_generate(config, cli.partials).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("honeycomb_sitemap=info,warn"),
            1 => EnvFilter::new("honeycomb_sitemap=debug,info"),
            2 => EnvFilter::new("honeycomb_sitemap=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Honeycomb-Sitemap Dry Run ===\n");

    println!("Source:");
    println!("  API base: {}", config.source.api_base_url);
    println!("  Collection base: {}", config.source.collection_base_url);

    println!("\nRobots.txt:");
    if config.robots.enabled {
        println!("  URL: {}", config.robots.url);
        println!("  Evaluated for: {}", config.robots.user_agent);
    } else {
        println!("  Disabled");
    }

    println!("\nCrawler:");
    println!(
        "  Max concurrent collections: {}",
        config.crawler.max_concurrent_collections
    );
    println!(
        "  Request timeout: {}s (connect {}s)",
        config.crawler.request_timeout_secs, config.crawler.connect_timeout_secs
    );
    println!("  User agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Sitemaps: {}", config.output.directory);
    println!("  Fragments: {}", config.output.partials_directory);
    println!("  Combined: {}", config.output.combined_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --combine mode
async fn handle_combine(config: &Config) -> anyhow::Result<()> {
    let combined = run_combine(config).await?;
    println!(
        "✓ Combined {} fragment files into {}",
        combined.fragments.len(),
        combined.path.display()
    );
    Ok(())
}

/// Handles the main sitemap run (per-collection sitemaps or fragments)
async fn handle_generate(config: Config, partials: bool) -> anyhow::Result<()> {
    let summary = if partials {
        tracing::info!("Writing fragments to {}", config.output.partials_directory);
        run_partials(config).await
    } else {
        tracing::info!("Writing sitemaps to {}", config.output.directory);
        run_generate(config).await
    };

    let summary = match summary {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            return Err(e.into());
        }
    };

    print_summary(&summary);

    if !summary.is_complete() {
        bail!("{} collection(s) could not be written", summary.failed.len());
    }

    tracing::info!("Done.");
    Ok(())
}
