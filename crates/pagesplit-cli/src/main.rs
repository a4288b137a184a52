//! pagesplit CLI: split a paged document into parts under a size budget.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use pagesplit_core::accessor::{DocumentAccessor, NeverCancel};
use pagesplit_core::budget::BYTES_PER_MB;
use pagesplit_core::config::{BacktrackStrategy, SplitConfig};
use pagesplit_core::manifest::SplitManifest;
use pagesplit_exec::SplitEngine;
use pagesplit_io::{FsStorage, PartNamer, ResourceDocument, MANIFEST_FILE};

#[derive(Parser)]
#[command(name = "pagesplit")]
#[command(about = "Split paged documents into parts that stay under a byte budget", long_about = None)]
struct Cli {
    /// More logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct BudgetArgs {
    /// Path to the document description (JSON)
    #[arg(short, long)]
    document: PathBuf,

    /// Maximum part size in MB (overrides PAGESPLIT_MAX_BYTES)
    #[arg(short = 'm', long)]
    max_mb: Option<f64>,

    /// Safety margin in (0, 1]
    #[arg(long)]
    margin: Option<f64>,

    /// Fixed number of pages added between probes
    #[arg(long)]
    batch_hint: Option<usize>,

    /// Bisect instead of stepping back one page at a time
    #[arg(long)]
    bisect: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a document and write the parts plus a manifest
    Split {
        #[command(flatten)]
        budget: BudgetArgs,

        /// Output directory
        #[arg(short, long)]
        out: PathBuf,

        /// File name stem for the parts (defaults to the document's name)
        #[arg(long)]
        stem: Option<String>,
    },

    /// Show part boundaries and probe counts without writing anything
    Explain {
        #[command(flatten)]
        budget: BudgetArgs,
    },

    /// Load a document and report its page count and size
    Validate {
        /// Path to the document description (JSON)
        #[arg(short, long)]
        document: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match &cli.command {
        Commands::Split { budget, out, stem } => run_split(budget, out, stem.as_deref()).map(|_| ()),
        Commands::Explain { budget } => explain(budget),
        Commands::Validate { document } => validate(document),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// `-v`/`-q` pick the level; `RUST_LOG`, when set, overrides it.
fn log_filter(cli: &Cli, env: Option<&str>) -> EnvFilter {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    env.and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(level))
}

fn init_logging(cli: &Cli) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(cli, env.as_deref()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    // Already set only when embedded; keep whichever came first.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Env first, then flags on top.
fn build_config(args: &BudgetArgs) -> SplitConfig {
    let mut config = SplitConfig::from_env();
    if let Some(mb) = args.max_mb {
        config = config.with_max_megabytes(mb);
    }
    if let Some(margin) = args.margin {
        config.safety_margin = margin;
    }
    if args.batch_hint.is_some() {
        config.batch_hint = args.batch_hint;
    }
    if args.bisect {
        config.backtrack = BacktrackStrategy::Bisect;
    }
    config
}

fn mb(bytes: usize) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

fn run_split(
    args: &BudgetArgs,
    out: &Path,
    stem: Option<&str>,
) -> Result<SplitManifest, Box<dyn std::error::Error>> {
    let engine = SplitEngine::new(build_config(args))?;
    let doc = ResourceDocument::load(&args.document)?;
    let namer = match stem {
        Some(stem) => PartNamer::new(stem, "pdf"),
        None if !doc.name().is_empty() => PartNamer::new(doc.name(), "pdf"),
        None => PartNamer::from_source_path(&args.document),
    };

    println!(
        "Splitting {} ({} pages) into parts of at most {:.2} MB",
        args.document.display(),
        doc.page_count(),
        mb(engine.budget().max_bytes() as usize)
    );

    let progress = |percent: u8| debug!(percent, "progress");
    let out_dir = out.to_string_lossy();
    let report = engine
        .split_to(
            &doc,
            doc.name(),
            &FsStorage::new(),
            &out_dir,
            &namer,
            &progress,
            &NeverCancel,
        )?
        .ok_or("split was cancelled")?;

    for entry in &report.manifest.parts {
        println!(
            "  {}: pages {}-{}, {:.2} MB{}",
            entry.file_name,
            entry.first_page,
            entry.last_page,
            mb(entry.size_bytes),
            if entry.exceeds_budget { " (single page over budget)" } else { "" }
        );
    }
    println!(
        "✓ {} parts written to {} ({} probes, manifest: {})",
        report.manifest.parts.len(),
        out.display(),
        report.stats.probes,
        MANIFEST_FILE
    );
    Ok(report.manifest)
}

fn explain(args: &BudgetArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(args);
    let engine = SplitEngine::new(config.clone())?;
    let doc = ResourceDocument::load(&args.document)?;
    let (plan, stats) = engine.plan(&doc)?;

    println!("=== Split Plan ===");
    println!("Document: {} ({} pages)", args.document.display(), doc.page_count());
    println!(
        "Budget: {:.2} MB, margin {}, threshold {:.2} MB",
        mb(config.max_bytes as usize),
        config.safety_margin,
        engine.budget().threshold() / BYTES_PER_MB
    );
    println!("Backtracking: {:?}", config.backtrack);
    println!();

    for (i, part) in plan.parts().iter().enumerate() {
        println!(
            "  part {:>3}: {:<14} {:>8.2} MB{}",
            i + 1,
            part.range.to_string(),
            mb(part.size()),
            if part.exceeds_budget { "  OVERSIZED" } else { "" }
        );
    }

    println!();
    println!("=== Probes ===");
    println!("Total: {}", stats.probes);
    println!("Backtracking: {}", stats.backtrack_probes);
    println!("Bytes serialized: {:.2} MB", stats.bytes_serialized as f64 / BYTES_PER_MB);
    Ok(())
}

fn validate(document: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let doc = ResourceDocument::load(document)?;
    let size = doc.total_source_size_hint().unwrap_or(0);
    println!(
        "✓ {} is valid: {} pages, {:.2} MB",
        document.display(),
        doc.page_count(),
        size as f64 / BYTES_PER_MB
    );
    Ok(())
}
