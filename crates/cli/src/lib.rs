use anyhow::{bail, Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use domain_duplicator::{
    scan_store, CancelSignal, DomainExporter, DuplicatePipeline, InspectFinding, Inspector,
    RunStatus, ScanJob, ScanOutcome, UniqueCollector, UniqueCounts,
};
use domain_store::{JsonlStore, RecordStore};
use serde::Serialize;
use std::env;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod flags;
mod signals;

use flags::PoolArgs;

const STORE_ENV: &str = "DOMAIN_TOOLS_STORE";

fn print_stdout(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "domain-tools")]
#[command(about = "Find and repair duplicated domain records", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// JSON-lines store file (overrides DOMAIN_TOOLS_STORE)
    #[arg(long, global = true)]
    store: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Find keys stored more than once and collapse each to a single record
    Duplicates(DuplicatesArgs),

    /// Count distinct TLDs, registrable domains, full domains, and subdomains
    #[command(name = "unique-stats")]
    UniqueStats(UniqueStatsArgs),

    /// Re-parse every stored domain and report inconsistencies
    Inspect(InspectArgs),

    /// Write every full domain, one per line
    Export(ExportArgs),
}

#[derive(Args)]
struct DuplicatesArgs {
    #[command(flatten)]
    pool: PoolArgs,

    /// Repair the duplicates found so far even if the scan was interrupted
    #[arg(long)]
    repair_after_interrupt: bool,

    /// Report duplicates without repairing them
    #[arg(long)]
    dry_run: bool,

    /// Output the run report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct UniqueStatsArgs {
    #[command(flatten)]
    pool: PoolArgs,

    /// Write the sorted sets as JSON to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output counts as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct InspectArgs {
    #[command(flatten)]
    pool: PoolArgs,

    /// Also report domains containing this substring
    #[arg(long)]
    contains: Option<String>,

    /// Output findings as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ExportArgs {
    #[command(flatten)]
    pool: PoolArgs,

    /// Destination file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Status block shared by the scan-only subcommands.
#[derive(Serialize)]
struct ScanSummary<T> {
    status: RunStatus,
    scanned: u64,
    unchecked: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<String>,
    #[serde(flatten)]
    details: T,
}

impl<T> ScanSummary<T> {
    fn new(outcome: ScanOutcome, details: T) -> Self {
        Self {
            status: outcome.status(),
            scanned: outcome.scanned,
            unchecked: outcome.unchecked,
            failure: outcome.cancellation.map(|c| c.detail),
            details,
        }
    }

    fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }

    fn render_status(&self) -> String {
        let mut out = format!(
            "Status:              {} (exit {})\nRecords scanned:     {}\n",
            self.status.as_str(),
            self.exit_code(),
            self.scanned
        );
        if self.unchecked > 0 {
            out.push_str(&format!("Left unchecked:      {}\n", self.unchecked));
        }
        if let Some(failure) = &self.failure {
            out.push_str(&format!("Failure:             {failure}\n"));
        }
        out
    }
}

#[derive(Serialize)]
struct InspectDetails {
    total: u64,
    findings: Vec<InspectFinding>,
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON (or exported domains)
    let machine_output = match &cli.command {
        Commands::Duplicates(args) => args.json,
        Commands::UniqueStats(args) => args.json,
        Commands::Inspect(args) => args.json,
        Commands::Export(args) => args.output.is_none(),
    };
    if machine_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let store_path = resolve_store_path(cli.store.take())?;
    let store = Arc::new(
        JsonlStore::open(&store_path)
            .await
            .with_context(|| format!("Failed to open store {}", store_path.display()))?,
    );

    let code = match cli.command {
        Commands::Duplicates(args) => run_duplicates(store.clone(), args).await?,
        Commands::UniqueStats(args) => run_unique_stats(store.clone(), args).await?,
        Commands::Inspect(args) => run_inspect(store.clone(), args).await?,
        Commands::Export(args) => run_export(store.clone(), args).await?,
    };

    if store.is_dirty() {
        store
            .persist()
            .await
            .with_context(|| format!("Failed to save store {}", store_path.display()))?;
        log::info!("Saved {}", store_path.display());
    }

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn resolve_store_path(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    match env::var(STORE_ENV) {
        Ok(value) if !value.trim().is_empty() => Ok(PathBuf::from(value.trim())),
        _ => bail!("No store given: pass --store <path> or set {STORE_ENV}"),
    }
}

async fn run_duplicates(store: Arc<JsonlStore>, args: DuplicatesArgs) -> Result<i32> {
    let config = args
        .pool
        .to_config()
        .with_repair_after_interrupt(args.repair_after_interrupt)
        .with_dry_run(args.dry_run);

    let pipeline = DuplicatePipeline::new(store, config);
    let listener = signals::spawn_interrupt_listener(pipeline.interrupt_handle());
    let report = pipeline.run().await;
    listener.abort();

    if args.json {
        print_stdout(&serde_json::to_string_pretty(&report)?)?;
    } else {
        let mut text = report.render_text();
        if !report.duplicate_keys.is_empty() {
            text.push_str("\nDuplicated keys:\n");
            for key in &report.duplicate_keys {
                text.push_str(&format!("  {key}\n"));
            }
        }
        print_stdout(text.trim_end())?;
    }
    Ok(report.exit_code())
}

async fn scan_with<J: ScanJob>(store: Arc<JsonlStore>, pool: &PoolArgs, job: Arc<J>) -> ScanOutcome {
    let signal = CancelSignal::new();
    let listener = signals::spawn_interrupt_listener(signal.interrupt_handle());
    let outcome = scan_store(store, &pool.to_config(), signal, job).await;
    listener.abort();
    outcome
}

async fn run_unique_stats(store: Arc<JsonlStore>, args: UniqueStatsArgs) -> Result<i32> {
    let collector = Arc::new(UniqueCollector::new());
    let outcome = scan_with(store, &args.pool, collector.clone()).await;
    let sets = collector.take_sets();
    let summary = ScanSummary::new(outcome, sets.counts());

    if let Some(path) = &args.output {
        if summary.status == RunStatus::Completed {
            write_json_file(path, &sets)?;
            log::info!("Wrote unique sets to {}", path.display());
        } else {
            log::warn!("Scan incomplete, not writing {}", path.display());
        }
    }

    if args.json {
        print_stdout(&serde_json::to_string_pretty(&summary)?)?;
    } else {
        let UniqueCounts {
            tlds,
            domains,
            full_domains,
            subs,
        } = summary.details;
        let text = format!(
            "{}Unique TLDs:         {tlds}\nUnique domains:      {domains}\nUnique full domains: {full_domains}\nUnique subdomains:   {subs}",
            summary.render_status()
        );
        print_stdout(&text)?;
    }
    Ok(summary.exit_code())
}

async fn run_inspect(store: Arc<JsonlStore>, args: InspectArgs) -> Result<i32> {
    let total = store
        .count_all()
        .await
        .context("Failed to count records")?;
    if !args.json {
        print_stdout(&format!("Total records: {total}"))?;
    }

    let inspector = Arc::new(Inspector::new(args.contains.clone()));
    let outcome = scan_with(store, &args.pool, inspector.clone()).await;
    let summary = ScanSummary::new(
        outcome,
        InspectDetails {
            total,
            findings: inspector.take_findings(),
        },
    );

    if args.json {
        print_stdout(&serde_json::to_string_pretty(&summary)?)?;
    } else {
        let mut text = String::new();
        for finding in &summary.details.findings {
            text.push_str(&format!("{finding}\n"));
        }
        text.push_str(&summary.render_status());
        text.push_str(&format!(
            "Findings:            {}",
            summary.details.findings.len()
        ));
        print_stdout(&text)?;
    }
    Ok(summary.exit_code())
}

async fn run_export(store: Arc<JsonlStore>, args: ExportArgs) -> Result<i32> {
    let writer: Box<dyn Write + Send> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    };
    let exporter = Arc::new(DomainExporter::new(writer));
    let outcome = scan_with(store, &args.pool, exporter.clone()).await;
    exporter.flush().context("Failed to flush exported domains")?;

    let summary = ScanSummary::new(outcome, ());
    log::info!("Exported {} domain(s)", exporter.written());
    match &args.output {
        Some(_) => print_stdout(summary.render_status().trim_end())?,
        None if summary.status != RunStatus::Completed => {
            log::warn!("{}", summary.render_status().trim_end());
        }
        None => {}
    }
    Ok(summary.exit_code())
}

fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
