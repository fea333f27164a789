use anyhow::{bail, Context, Result};
use archmap_cache::{CacheLimits, ChangeCache};
use archmap_extractor::{ExtractorConfig, ParserPool, PluginRegistry};
use archmap_scanner::{ScanConfig, ScanReport, ScanSession};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "archmap")]
#[command(about = "Map services, endpoints and calls across a polyglot repository", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a repository and write its architecture manifest
    Scan(ScanArgs),

    /// List the registered language plugins
    Plugins(PluginsArgs),

    /// Show what a change-cache snapshot holds
    #[command(name = "cache-stats")]
    CacheStats(CacheStatsArgs),
}

#[derive(Args)]
struct ScanArgs {
    /// Repository root (defaults to current directory)
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Config file (defaults to <ROOT>/archmap.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Manifest output path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Change-cache snapshot path
    #[arg(long, conflicts_with = "no_cache")]
    cache: Option<PathBuf>,

    /// Do not load or save the change cache
    #[arg(long)]
    no_cache: bool,

    /// Re-extract every file, ignoring the previous manifest and cache
    #[arg(long)]
    full: bool,

    /// Maximum directory depth (0 = unlimited)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Only scan files with these extensions (repeatable or comma-separated)
    #[arg(long = "ext", value_delimiter = ',', num_args = 1..)]
    extensions: Vec<String>,

    /// Follow symbolic links
    #[arg(long)]
    follow_symlinks: bool,

    /// Directory with per-plugin query overrides (<DIR>/<plugin>/<kind>.scm)
    #[arg(long)]
    query_dir: Option<PathBuf>,

    /// Print the manifest JSON to stdout
    #[arg(long)]
    stdout: bool,
}

#[derive(Args)]
struct PluginsArgs {
    /// Directory with per-plugin query overrides
    #[arg(long)]
    query_dir: Option<PathBuf>,
}

#[derive(Args)]
struct CacheStatsArgs {
    /// Snapshot written by `archmap scan`
    cache_file: PathBuf,
}

fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // stdout is reserved for the manifest
    if let Commands::Scan(args) = &cli.command {
        if args.stdout {
            cli.quiet = true;
        }
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Scan(args) => run_scan(args, cli.quiet)?,
        Commands::Plugins(args) => run_plugins(args)?,
        Commands::CacheStats(args) => run_cache_stats(&args.cache_file)?,
    }

    Ok(())
}

fn scan_config(args: &ScanArgs) -> Result<ScanConfig> {
    let mut config = match &args.config {
        Some(path) => ScanConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ScanConfig::discover(&args.root).context("Failed to load config")?,
    };

    if let Some(output) = &args.output {
        config.output = output.clone();
    }
    if args.no_cache {
        config.cache_file = None;
    } else if let Some(cache) = &args.cache {
        config.cache_file = Some(cache.clone());
    }
    if args.full {
        config.incremental = false;
    }
    if let Some(depth) = args.max_depth {
        config.walker.max_depth = depth;
    }
    if !args.extensions.is_empty() {
        config.walker.extensions = args.extensions.clone();
    }
    if args.follow_symlinks {
        config.walker.follow_symlinks = true;
    }
    if let Some(dir) = &args.query_dir {
        config.extractor.query_dir = Some(dir.clone());
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn run_scan(args: ScanArgs, quiet: bool) -> Result<()> {
    let config = scan_config(&args)?;
    let mut session =
        ScanSession::new(&args.root, config).context("Failed to set up the scan")?;
    let report = session
        .run()
        .with_context(|| format!("Scan of {} failed", args.root.display()))?;

    if args.stdout {
        println!("{}", session.manifest().to_json_string()?);
    }
    if !quiet {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &ScanReport) {
    eprintln!(
        "Scanned {} files in {:.2}s: {} analyzed, {} unchanged, {} unsupported, {} failed, {} removed",
        report.walk.files_matched,
        report.duration.as_secs_f64(),
        report.files_analyzed,
        report.files_unchanged,
        report.files_unsupported,
        report.files_failed,
        report.files_removed
    );
    if report.syntax_error_files > 0 {
        eprintln!(
            "  {} files had syntax errors (partial extraction)",
            report.syntax_error_files
        );
    }
    eprintln!(
        "  {} services, {} endpoints, {} edges",
        report.services, report.endpoints, report.edges
    );
    eprintln!(
        "  cache: {} entries, hit rate {:.1}%",
        report.cache.entries,
        report.cache.hit_rate() * 100.0
    );
    eprintln!("Manifest written to {}", report.output.display());
}

fn run_plugins(args: PluginsArgs) -> Result<()> {
    let config = ExtractorConfig {
        query_dir: args.query_dir,
        ..ExtractorConfig::default()
    };
    let pool = Arc::new(ParserPool::new(config.max_parsers_per_grammar)?);
    let registry = PluginRegistry::with_defaults(pool, &config)?;

    for plugin in registry.plugins() {
        println!(
            "{:<12} {:<8} {}",
            plugin.name,
            plugin.version,
            plugin
                .extensions
                .iter()
                .map(|ext| format!(".{ext}"))
                .collect::<Vec<_>>()
                .join(" ")
        );
    }
    Ok(())
}

fn run_cache_stats(path: &Path) -> Result<()> {
    if !path.is_file() {
        bail!("Cache file {} does not exist", path.display());
    }
    let cache = ChangeCache::load(path, CacheLimits::unlimited())
        .with_context(|| format!("Failed to read cache {}", path.display()))?;
    let stats = cache.stats();

    println!("entries: {}", stats.entries);
    println!("bytes:   {}", stats.total_bytes);
    if let Some(oldest) = cache.iter_lru().next() {
        println!("oldest:  {}", oldest.path);
    }
    if let Some(newest) = cache.iter_lru().last() {
        println!("newest:  {}", newest.path);
    }
    Ok(())
}
