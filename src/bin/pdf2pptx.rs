//! CLI binary for pdf2pptx.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2pptx::{
    convert_to_file, ConversionConfig, ConversionProgressCallback, ConversionReport, Diagnostic,
    ProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback. Pages load concurrently and may finish out
/// of order; composition then runs in page order.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Resolving page results…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize, prefix: &'static str) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_style(progress_style);
        self.bar.set_prefix(prefix);
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages, "Loading");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Loading {total_pages} page results…"))
        ));
    }

    fn on_page_loaded(&self, page_num: usize, total: usize, element_count: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{element_count:>4} elements")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Keep one line per page.
        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_page_composed(&self, page_num: usize, _total: usize, _shape_count: usize) {
        if self.bar.prefix() != "Composing" {
            let len = self.bar.length().unwrap_or(0) as usize;
            self.activate_bar(len, "Composing");
        }
        self.bar.set_message(format!("page {page_num}"));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_pages: usize, slide_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} slides composed",
                green("✔"),
                bold(&slide_count.to_string())
            );
        } else {
            eprintln!(
                "{} {} slides from {} pages  ({} failed)",
                cyan("⚠"),
                bold(&slide_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One result ZIP per page, in page order
  pdf2pptx page1.zip page2.zip page3.zip -o deck.pptx

  # A cache root holding <hash>_page_<N>/mineru_result.zip folders
  pdf2pptx cache/ -o deck.pptx

  # Results fetched by URL
  pdf2pptx https://cdn.example.org/p1.zip https://cdn.example.org/p2.zip -o deck.pptx

  # 4:3 slides, keep overlays, report as JSON
  pdf2pptx cache/ -o deck.pptx --slide-width 10 --slide-height 7.5 --keep-watermark --json

  # All tuning knobs from a file
  pdf2pptx cache/ -o deck.pptx --config pdf2pptx.toml

INPUTS:
  Each source is one page: a directory holding *_content_list.json (and
  optionally *layout.json and images/), a ZIP with the same files, or an
  HTTP(S) URL of such a ZIP. A directory of <hash>_page_<N>/ folders expands
  into its pages sorted by N.

ENVIRONMENT VARIABLES:
  PDF2PPTX_*   every flag has an env equivalent, e.g. PDF2PPTX_CONCURRENCY
  RUST_LOG     overrides the log filter set by -v / -q
"#;

/// Rebuild editable PowerPoint decks from per-page document-parser results.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2pptx",
    version,
    about = "Rebuild editable PowerPoint decks from per-page document-parser results",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Page result sources, in page order: directories, ZIPs, URLs, or cache roots.
    #[arg(required = true)]
    sources: Vec<String>,

    /// Output .pptx path.
    #[arg(short, long, env = "PDF2PPTX_OUTPUT", default_value = "output.pptx")]
    output: PathBuf,

    /// TOML configuration file; flags override its values.
    #[arg(long, env = "PDF2PPTX_CONFIG")]
    config: Option<PathBuf>,

    /// Slide width in inches [default: 16].
    #[arg(long, env = "PDF2PPTX_SLIDE_WIDTH")]
    slide_width: Option<f64>,

    /// Slide height in inches [default: 9].
    #[arg(long, env = "PDF2PPTX_SLIDE_HEIGHT")]
    slide_height: Option<f64>,

    /// Keep repeated overlay text instead of removing it.
    #[arg(long, env = "PDF2PPTX_KEEP_WATERMARK")]
    keep_watermark: bool,

    /// Watermark keyword (repeatable); replaces the default list.
    #[arg(long = "watermark-keyword", env = "PDF2PPTX_WATERMARK_KEYWORDS", value_delimiter = ',')]
    watermark_keywords: Vec<String>,

    /// Fraction of pages an overlay must appear on (0–1) [default: 0.5].
    #[arg(long, env = "PDF2PPTX_WATERMARK_THRESHOLD")]
    watermark_threshold: Option<f64>,

    /// Insert a notice slide for pages that failed to load.
    #[arg(long, env = "PDF2PPTX_PLACEHOLDER_FAILED")]
    placeholder_failed: bool,

    /// Page results loaded concurrently [default: 8].
    #[arg(short, long, env = "PDF2PPTX_CONCURRENCY")]
    concurrency: Option<usize>,

    /// HTTP download timeout in seconds [default: 120].
    #[arg(long, env = "PDF2PPTX_DOWNLOAD_TIMEOUT")]
    download_timeout: Option<u64>,

    /// Print stats and diagnostics as JSON on stdout.
    #[arg(long, env = "PDF2PPTX_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2PPTX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2PPTX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2PPTX_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless -v is given.
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let start = Instant::now();
    let report = convert_to_file(cli.sources.as_slice(), &cli.output, &config)
        .await
        .context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&report, &cli.output, start.elapsed());
    }

    Ok(())
}

/// Map CLI args onto `ConversionConfig`, starting from `--config` if given.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let base = match cli.config {
        Some(ref path) => ConversionConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => ConversionConfig::default(),
    };

    let width = cli.slide_width.unwrap_or(base.slide_width_in);
    let height = cli.slide_height.unwrap_or(base.slide_height_in);
    let remove_watermark = base.remove_watermark && !cli.keep_watermark;
    let placeholder = base.placeholder_for_failed_pages || cli.placeholder_failed;

    let mut builder = base
        .into_builder()
        .slide_size_inches(width, height)
        .remove_watermark(remove_watermark)
        .placeholder_for_failed_pages(placeholder);

    if !cli.watermark_keywords.is_empty() {
        builder = builder.watermark_keywords(cli.watermark_keywords.iter().cloned());
    }
    if let Some(t) = cli.watermark_threshold {
        builder = builder.watermark_threshold(t);
    }
    if let Some(n) = cli.concurrency {
        builder = builder.concurrency(n);
    }
    if let Some(secs) = cli.download_timeout {
        builder = builder.download_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(report: &ConversionReport, output: &std::path::Path, elapsed: Duration) {
    let stats = &report.stats;
    eprintln!(
        "{}  {}/{} pages  {}ms  →  {}",
        if stats.failed_pages == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        stats.composed_pages,
        stats.total_pages,
        elapsed.as_millis(),
        bold(&output.display().to_string()),
    );
    eprintln!(
        "   {} elements  /  {} skipped  /  {} watermarks removed",
        dim(&stats.elements_rendered.to_string()),
        dim(&stats.elements_skipped.to_string()),
        dim(&stats.watermarks_removed.to_string()),
    );

    let mismatches = report
        .diagnostics
        .iter()
        .filter(|d| matches!(d, Diagnostic::CoordinateMismatch { .. }))
        .count();
    if mismatches > 0 {
        eprintln!("   {} pages had mismatched coordinate spaces", dim(&mismatches.to_string()));
    }
    if stats.degraded_pages > 0 {
        eprintln!("   {} pages used the fallback page size", dim(&stats.degraded_pages.to_string()));
    }
}
