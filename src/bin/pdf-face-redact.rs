//! CLI binary for pdf-face-redact.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `RedactionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_face_redact::{
    inspect, redact, scan, PageSelection, ProgressCallback, RedactionConfig,
    RedactionProgressCallback, StrokeColor,
};
use serde_json::json;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the page currently in flight. Pages never overlap.
    page_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    /// Spinner until `on_sweep_start` tells us the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Loading model…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Scanning");
        self.bar.reset_eta();
    }

    fn page_elapsed_secs(&self) -> f64 {
        self.page_started
            .lock()
            .ok()
            .and_then(|mut started| started.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl RedactionProgressCallback for CliProgressCallback {
    fn on_sweep_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Scanning {total_pages} pages for faces…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut started) = self.page_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, faces: usize) {
        let secs = self.page_elapsed_secs();
        let faces_label = match faces {
            0 => dim("no faces"),
            1 => "1 face".to_string(),
            n => format!("{n} faces"),
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            page_num,
            total,
            faces_label,
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.page_elapsed_secs();
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.abandon();
    }

    fn on_sweep_complete(&self, total_pages: usize, markers_committed: usize, faces: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} faces on {}/{} pages",
            green("✔"),
            bold(&faces.to_string()),
            markers_committed,
            total_pages,
        );
    }
}

const AFTER_HELP: &str = r##"EXAMPLES:
  # Redact faces into a new file
  pdf-face-redact --model seeta_fd_frontal_v1.0.bin scan.pdf -o scan.redacted.pdf

  # Default output name: <input>.redacted.pdf
  pdf-face-redact --model seeta_fd_frontal_v1.0.bin scan.pdf

  # Only pages 3 to 10, stricter threshold, blue markers
  pdf-face-redact --pages 3-10 --min-confidence 0.6 --color "#0000FF" scan.pdf

  # Dry run: report faces without writing a PDF
  pdf-face-redact --dry-run --json scan.pdf > faces.json

  # Inspect PDF metadata (no model needed)
  pdf-face-redact --inspect-only scan.pdf

ENVIRONMENT VARIABLES:
  FACE_REDACT_MODEL       Path to the SeetaFace model file
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Overrides the log filter (e.g. pdf_face_redact=debug)

NOTES:
  Markers are /Redact annotations. Open the output in a PDF editor and
  apply the redactions to remove the underlying content.
"##;

/// Detect faces in PDF pages and mark them for redaction.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-face-redact",
    version,
    about = "Detect faces in PDF pages and mark them for redaction",
    long_about = "Rasterise each page of a PDF (local file or URL), detect faces with the \
SeetaFace frontal cascade, and add one /Redact annotation per page covering every face found.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write the annotated PDF here. Default: <input>.redacted.pdf.
    #[arg(short, long, env = "FACE_REDACT_OUTPUT")]
    output: Option<PathBuf>,

    /// SeetaFace frontal detector model file.
    #[arg(short, long, env = "FACE_REDACT_MODEL")]
    model: Option<PathBuf>,

    /// Rasterisation zoom (0, 1].
    #[arg(long, env = "FACE_REDACT_ZOOM", default_value_t = 0.5)]
    zoom: f32,

    /// Minimum detection confidence (0.0–1.0).
    #[arg(long, env = "FACE_REDACT_MIN_CONFIDENCE", default_value_t = 0.40)]
    min_confidence: f32,

    /// Maximum faces redacted per page.
    #[arg(long, env = "FACE_REDACT_MAX_RESULTS", default_value_t = 300)]
    max_results: usize,

    /// Smallest face edge in raster pixels (minimum 20).
    #[arg(long, env = "FACE_REDACT_MIN_FACE_SIZE", default_value_t = 20)]
    min_face_size: u32,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "FACE_REDACT_PAGES", default_value = "all")]
    pages: String,

    /// Marker author. Default: $USER, then "Guest".
    #[arg(long, env = "FACE_REDACT_AUTHOR")]
    author: Option<String>,

    /// Marker stroke colour as #RRGGBB.
    #[arg(long, env = "FACE_REDACT_COLOR", default_value = "#FF0000")]
    color: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "FACE_REDACT_PASSWORD")]
    password: Option<String>,

    /// Path to libpdfium (file or directory).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Detect only; do not write a PDF.
    #[arg(long)]
    dry_run: bool,

    /// Print the sweep report as JSON on stdout.
    #[arg(long, env = "FACE_REDACT_JSON")]
    json: bool,

    /// Print PDF metadata only, no detection.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "FACE_REDACT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FACE_REDACT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FACE_REDACT_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "FACE_REDACT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&cli.input, cli.password.as_deref(), cli.pdfium_lib.as_deref())
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = info.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = info.author {
                println!("Author:       {}", a);
            }
            println!("Pages:        {}", info.page_count);
            println!("PDF Version:  {}", info.pdf_version);
            for page in &info.pages {
                println!(
                    "  {:>4}  {:.0} × {:.0} pt",
                    page.page_num, page.width, page.height
                );
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn RedactionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Dry run ──────────────────────────────────────────────────────────
    if cli.dry_run {
        let (report, markers) = scan(&cli.input, &config).await.context("Scan failed")?;
        if cli.json {
            let out = json!({ "report": report, "markers": markers });
            println!(
                "{}",
                serde_json::to_string_pretty(&out).context("Failed to serialise report")?
            );
        } else if !cli.quiet {
            for page in report.redacted_pages() {
                println!("page {:>4}  {} faces", page.page_num, page.faces);
            }
            eprintln!(
                "{} faces on {}/{} pages  {}ms  (dry run, nothing written)",
                report.stats.total_faces,
                report.stats.markers_committed,
                report.stats.selected_pages,
                report.stats.total_duration_ms,
            );
        }
        return Ok(());
    }

    // ── Redact ───────────────────────────────────────────────────────────
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));

    let report = redact(&cli.input, &output_path, &config)
        .await
        .with_context(|| format!("Redaction failed (partial output, if any: {})", output_path.display()))?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {} faces on {}/{} pages  {}ms  →  {}",
            if report.stats.total_faces == 0 {
                cyan("○")
            } else {
                green("✔")
            },
            report.stats.total_faces,
            report.stats.markers_committed,
            report.stats.selected_pages,
            report.stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `RedactionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<RedactionConfig> {
    let pages = parse_pages(&cli.pages)?;
    let color: StrokeColor = cli.color.parse().context("Invalid --color")?;

    let mut builder = RedactionConfig::builder()
        .zoom(cli.zoom)
        .min_confidence(cli.min_confidence)
        .max_results(cli.max_results)
        .min_face_size(cli.min_face_size)
        .pages(pages)
        .stroke_color(color)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model_path(model);
    }
    if let Some(ref author) = cli.author {
        builder = builder.author(author);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(lib);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `scan.pdf` → `scan.redacted.pdf`, next to the input. URLs land in the
/// current directory under their last path segment.
fn default_output_path(input: &str) -> PathBuf {
    let name = input
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("document.pdf");
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let file = format!("{stem}.redacted.pdf");

    if input.starts_with("http://") || input.starts_with("https://") {
        PathBuf::from(file)
    } else {
        Path::new(input).with_file_name(file)
    }
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
