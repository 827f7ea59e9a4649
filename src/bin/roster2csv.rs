//! CLI binary for pharmacy-roster.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `RosterConfig`, writes the CSV and prints a short preview.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pharmacy_roster::pipeline::input::{archive_pdf, is_url, resolve_input};
use pharmacy_roster::sink::write_csv;
use pharmacy_roster::{
    convert_resolved, inspect_with, PageLayout, PageSelection, ProgressCallback, RosterConfig,
    RosterProgressCallback, DEFAULT_ROSTER_URL,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner until the page count is known,
/// then a bar that advances once per assembled page.
struct CliProgressCallback {
    bar: ProgressBar,
    records: AtomicUsize,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            records: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Reading");
    }
}

impl RosterProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, _page_num: usize, _total: usize, record_count: usize) {
        let so_far = self.records.fetch_add(record_count, Ordering::SeqCst) + record_count;
        self.bar.set_message(format!("{so_far} records"));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, total_pages: usize, total_records: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} records from {} pages",
            green("✔"),
            bold(&total_records.to_string()),
            total_pages
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Download today's roster, write data/community_pharmacies_<date>.csv
  roster2csv

  # A downloaded roster is archived as pdf/CommunityPharmacyRoster_<date>.pdf;
  # choose another directory, or skip the copy
  roster2csv --save-pdf archive
  roster2csv --no-save-pdf

  # Parse a local copy into a chosen file
  roster2csv pdf/CommunityPharmacyRoster_2025-01-31.pdf -o roster.csv

  # Full structured output (records, per-page stats, metadata)
  roster2csv --json > roster.json

  # Only the first three pages, show ten rows
  roster2csv --pages 1-3 --preview 10

  # Inspect PDF metadata only
  roster2csv --inspect-only

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to a libpdfium shared library
  RUST_LOG          Log filter, overrides --verbose / --quiet
  ROSTER_*          Every flag also reads ROSTER_<FLAG> (e.g. ROSTER_OUTPUT)
"#;

/// Convert the Nebraska community pharmacy roster PDF to CSV.
#[derive(Parser, Debug)]
#[command(
    name = "roster2csv",
    version,
    about = "Convert the Nebraska DHHS Community Pharmacy Roster PDF to CSV",
    long_about = "Download (or read) the Nebraska DHHS Community Pharmacy Roster PDF, rebuild \
its table rows from text positions, split each address into street/city/state/ZIP and \
write the result as CSV.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    #[arg(env = "ROSTER_INPUT", default_value = DEFAULT_ROSTER_URL)]
    input: String,

    /// CSV destination [default: data/community_pharmacies_<today>.csv].
    #[arg(short, long, env = "ROSTER_OUTPUT")]
    output: Option<PathBuf>,

    /// Save a dated copy of the PDF (CommunityPharmacyRoster_<today>.pdf) in this
    /// directory [default for URL input: pdf].
    #[arg(long, env = "ROSTER_SAVE_PDF", value_name = "DIR")]
    save_pdf: Option<PathBuf>,

    /// Do not keep a copy of a downloaded PDF.
    #[arg(long, env = "ROSTER_NO_SAVE_PDF", conflicts_with = "save_pdf")]
    no_save_pdf: bool,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "ROSTER_PAGES", default_value = "all")]
    pages: String,

    /// JSON file with a custom page layout (column ranges, cutoffs, tolerances).
    #[arg(long, env = "ROSTER_LAYOUT", value_name = "FILE")]
    layout: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "ROSTER_PASSWORD")]
    password: Option<String>,

    /// Number of records to print after conversion.
    #[arg(long, env = "ROSTER_PREVIEW", default_value_t = 5)]
    preview: usize,

    /// Print the full structured output as JSON on stdout instead of the preview.
    #[arg(long, env = "ROSTER_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "ROSTER_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "ROSTER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "ROSTER_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "ROSTER_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level logs unless --verbose is set.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let config = build_config(&cli, None).await?;
        let meta = inspect_with(&cli.input, &config)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref d) = meta.creation_date {
                println!("Created:      {}", d);
            }
            if let Some(ref d) = meta.modification_date {
                println!("Modified:     {}", d);
            }
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn RosterProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    let today = Local::now().date_naive();
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(Path::new("data"), today));

    // ── Resolve (and optionally archive) the PDF ─────────────────────────
    let resolved = resolve_input(&cli.input, config.download_timeout_secs)
        .await
        .with_context(|| format!("Failed to open {}", cli.input))?;

    if let Some(dir) = archive_dir(&cli) {
        let saved = archive_pdf(&resolved, &dir, today)
            .await
            .context("Failed to save PDF copy")?;
        if !cli.quiet {
            eprintln!("{} PDF saved to {}", cyan("◆"), bold(&saved.display().to_string()));
        }
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let output = convert_resolved(resolved, &config)
        .await
        .context("Conversion failed")?;

    write_csv(&output_path, &output.records)
        .await
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    if cli.quiet {
        return Ok(());
    }

    let stats = &output.stats;
    eprintln!(
        "{}  {} records  {}/{} pages  {}ms  →  {}",
        green("✔"),
        stats.total_records,
        stats.processed_pages,
        stats.total_pages,
        stats.total_duration_ms,
        bold(&output_path.display().to_string()),
    );
    if stats.unanchored_addresses > 0 || stats.unnormalized_dates > 0 {
        eprintln!(
            "   {} {} addresses without state/ZIP, {} records with unparsed dates",
            yellow("⚠"),
            stats.unanchored_addresses,
            stats.unnormalized_dates
        );
    }

    if cli.preview > 0 && !output.records.is_empty() {
        println!();
        println!("{}", dim(&format!("First {} records:", cli.preview.min(output.records.len()))));
        for record in output.records.iter().take(cli.preview) {
            println!("  {}", record.summary());
        }
    }

    Ok(())
}

/// Map CLI args to `RosterConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<RosterConfig> {
    let mut builder = RosterConfig::builder()
        .pages(parse_pages(&cli.pages)?)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref path) = cli.layout {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read layout from {:?}", path))?;
        let layout: PageLayout = serde_json::from_str(&text)
            .with_context(|| format!("Invalid layout JSON in {:?}", path))?;
        builder = builder.layout(layout);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Where to archive the PDF: `--save-pdf` if given, else `pdf/` for a
/// downloaded roster. Local files are only copied on request.
fn archive_dir(cli: &Cli) -> Option<PathBuf> {
    if cli.no_save_pdf {
        return None;
    }
    match cli.save_pdf {
        Some(ref dir) => Some(dir.clone()),
        None if is_url(&cli.input) => Some(PathBuf::from("pdf")),
        None => None,
    }
}

/// `<dir>/community_pharmacies_<YYYY-MM-DD>.csv`
fn default_output_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("community_pharmacies_{}.csv", date.format("%Y-%m-%d")))
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .context(format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}
