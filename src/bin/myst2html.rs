//! CLI binary for myst-reader.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ReaderSettings`, reads every source it is pointed at and writes the
//! resulting fragments.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use myst_reader::pipeline::input::discover_sources;
use myst_reader::{
    write_fragment, BatchOutput, ListSplitProcessor, MystReader, ReadProgressCallback,
    ReaderSettings,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

/// Terminal progress callback: one bar for the batch plus a log line per
/// document.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time of the document currently being read.
    started: Mutex<Option<Instant>>,
    /// Documents reported through `on_document_error`.
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Reading");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn failed_count(&self) -> usize {
        self.errors.load(Ordering::SeqCst)
    }

    fn elapsed_secs(&self) -> f64 {
        self.started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ReadProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.bar.set_length(total_documents as u64);
        self.bar.reset_eta();
    }

    fn on_document_start(&self, path: &Path, _index: usize, _total: usize) {
        if let Ok(mut t) = self.started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(path.display().to_string());
    }

    fn on_document_complete(&self, path: &Path, html_len: usize) {
        let secs = self.elapsed_secs();
        self.bar.println(format!(
            "  {} {}  {}  {}",
            green("✓"),
            path.display(),
            dim(&format!("{html_len:>6} bytes")),
            dim(&format!("{secs:.2}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, path: &Path, error: &str) {
        let secs = self.elapsed_secs();
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} {}  {}  {}",
            red("✗"),
            path.display(),
            red(error),
            dim(&format!("{secs:.2}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_documents: usize, success_count: usize) {
        let failed = self.failed_count();
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} documents read successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} documents read  ({} failed)",
                if failed == total_documents {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_documents,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One document to stdout
  myst2html content/post.md

  # A whole content tree into an output directory
  myst2html content/ -o output/

  # Use a Pelican-style settings file
  myst2html --settings pelicanconf.yaml content/ -o output/

  # Enable extensions and reading time
  myst2html -x deflist -x tasklist --reading-time content/post.md

  # HTML and metadata as JSON
  myst2html --json content/post.md > post.json

SETTINGS FILE KEYS:
  MYST_EXTENSIONS         list of MyST extensions to enable
  MYST_DEFAULT_FILES      converter defaults files (validated on start-up)
  READING_SPEED           words per minute (default 200)
  CALCULATE_READING_TIME  add reading_time to metadata
  MYST_FILE_EXTENSIONS    source extensions picked up in directories
"#;

/// Read MyST Markdown documents into HTML fragments and metadata.
#[derive(Parser, Debug)]
#[command(
    name = "myst2html",
    version,
    about = "Read MyST Markdown documents into HTML fragments and metadata",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Source files or directories.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Write fragments under this directory instead of stdout.
    #[arg(short, long, env = "MYST2HTML_OUTPUT")]
    output: Option<PathBuf>,

    /// YAML settings file with Pelican-style keys.
    #[arg(long, env = "MYST2HTML_SETTINGS")]
    settings: Option<PathBuf>,

    /// MyST extension to enable (repeatable).
    #[arg(short = 'x', long = "extension")]
    extensions: Vec<String>,

    /// Converter defaults file (repeatable).
    #[arg(long = "default-file")]
    default_files: Vec<PathBuf>,

    /// Words per minute for --reading-time.
    #[arg(long, env = "MYST2HTML_READING_SPEED")]
    reading_speed: Option<String>,

    /// Add reading_time to the metadata.
    #[arg(long, env = "MYST2HTML_READING_TIME")]
    reading_time: bool,

    /// Split comma-separated tags and authors into lists.
    #[arg(long)]
    split_lists: bool,

    /// Emit metadata as JSON (alongside fragments with -o, or as the whole
    /// stdout output without it).
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "MYST2HTML_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MYST2HTML_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MYST2HTML_QUIET")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar already reports every document; keep INFO logs out
    // of its way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && cli.output.is_some();
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build reader ─────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new);
    let settings = build_settings(&cli, progress.clone())?;
    let reader = MystReader::new(settings).context("Invalid reader configuration")?;

    // ── Collect sources ──────────────────────────────────────────────────
    let mut sources: Vec<(PathBuf, PathBuf)> = Vec::new();
    for input in &cli.inputs {
        let found = discover_sources(input, reader.settings().file_extensions.as_slice())
            .with_context(|| format!("Failed to scan {}", input.display()))?;
        for source in found {
            let relative = output_relative_path(input, &source);
            sources.push((source, relative));
        }
    }
    if sources.is_empty() {
        anyhow::bail!("No source documents found");
    }

    // ── Read ─────────────────────────────────────────────────────────────
    let batch = reader.process_all(sources.iter().map(|(source, _)| source));

    // ── Write ────────────────────────────────────────────────────────────
    match cli.output {
        Some(ref out_dir) => write_outputs(&batch, &sources, out_dir, cli.json)?,
        None => print_outputs(&batch, cli.json)?,
    }

    if !cli.quiet && !show_progress {
        for (path, error) in batch.failures() {
            eprintln!("{} {}: {}", red("✗"), path.display(), error);
        }
    }

    if batch.stats.failed_documents > 0 {
        anyhow::bail!(
            "{} of {} documents failed",
            batch.stats.failed_documents,
            batch.stats.total_documents
        );
    }
    Ok(())
}

/// Map CLI args onto `ReaderSettings`, starting from the settings file when
/// one is given.
fn build_settings(
    cli: &Cli,
    progress: Option<Arc<CliProgressCallback>>,
) -> Result<ReaderSettings> {
    let mut settings = match cli.settings {
        Some(ref path) => ReaderSettings::from_yaml_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => ReaderSettings::default(),
    };

    settings.extensions.extend(cli.extensions.iter().cloned());
    settings
        .default_files
        .extend(cli.default_files.iter().cloned());
    if let Some(ref speed) = cli.reading_speed {
        settings.reading_speed = serde_json::Value::String(speed.clone());
    }
    if cli.reading_time {
        settings.calculate_reading_time = true;
    }
    if cli.split_lists {
        settings.metadata_processor = Some(Arc::new(ListSplitProcessor::default()));
    }
    if let Some(cb) = progress {
        settings.progress_callback = Some(cb as Arc<dyn ReadProgressCallback>);
    }
    Ok(settings)
}

/// Path of `source` relative to the input it was found under, or its file
/// name when the input was the file itself.
fn output_relative_path(input: &Path, source: &Path) -> PathBuf {
    match source.strip_prefix(input) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
        _ => source
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| source.to_path_buf()),
    }
}

fn write_outputs(
    batch: &BatchOutput,
    sources: &[(PathBuf, PathBuf)],
    out_dir: &Path,
    with_json: bool,
) -> Result<()> {
    for (doc, (_, relative)) in batch.documents.iter().zip(sources) {
        let Ok(ref output) = doc.result else {
            continue;
        };
        let target = out_dir.join(relative).with_extension("html");
        write_fragment(&target, &output.html)
            .with_context(|| format!("Failed to write {}", target.display()))?;

        if with_json {
            let json = serde_json::to_string_pretty(&output.metadata)
                .context("Failed to serialise metadata")?;
            let meta_path = target.with_extension("json");
            write_fragment(&meta_path, &json)
                .with_context(|| format!("Failed to write {}", meta_path.display()))?;
        }
    }
    Ok(())
}

fn print_outputs(batch: &BatchOutput, as_json: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    if as_json {
        let records: Vec<serde_json::Value> = batch
            .documents
            .iter()
            .filter_map(|doc| {
                let output = doc.result.as_ref().ok()?;
                Some(serde_json::json!({
                    "source": doc.source_path.display().to_string(),
                    "html": output.html,
                    "metadata": output.metadata,
                }))
            })
            .collect();
        let json = serde_json::to_string_pretty(&records).context("Failed to serialise output")?;
        writeln!(handle, "{json}").context("Failed to write to stdout")?;
        return Ok(());
    }

    for doc in &batch.documents {
        let Ok(ref output) = doc.result else {
            continue;
        };
        handle
            .write_all(output.html.as_bytes())
            .context("Failed to write to stdout")?;
        // Ensure a trailing newline on stdout.
        if !output.html.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_counts_reported_errors() {
        let cb = CliProgressCallback::new();
        cb.on_batch_start(3);
        cb.on_document_error(Path::new("a.md"), "missing front matter");
        cb.on_document_complete(Path::new("b.md"), 10);
        cb.on_document_error(Path::new("c.md"), "bad yaml");
        assert_eq!(cb.failed_count(), 2);
        cb.on_batch_complete(3, 1);
    }

    #[test]
    fn output_paths_relative_to_input() {
        let input = Path::new("content");
        assert_eq!(
            output_relative_path(input, Path::new("content/posts/a.md")),
            PathBuf::from("posts/a.md")
        );
        assert_eq!(
            output_relative_path(Path::new("post.md"), Path::new("post.md")),
            PathBuf::from("post.md")
        );
    }
}
