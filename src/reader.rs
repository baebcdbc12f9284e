//! Document reading entry points.
//!
//! [`MystReader`] is built once per site from [`ReaderSettings`] and then
//! reads any number of documents. Everything that can be decided up front
//! (extension names, converter defaults) is decided in [`MystReader::new`],
//! so a bad configuration fails before the first document is touched and
//! the parser configuration never changes between documents.

use crate::config::{ParserConfig, ReaderSettings};
use crate::error::MystReaderError;
use crate::metadata::{normalize_metadata, IdentityProcessor, MetadataProcessor};
use crate::output::{BatchOutput, BatchStats, DocumentResult, ReadOutput};
use crate::pipeline::bibliography::{append_bibliography_directives, find_bibliographies};
use crate::pipeline::engine::{ComrakConverter, Converter};
use crate::pipeline::formats::{load_defaults, validate_defaults, Defaults};
use crate::pipeline::input::{check_metadata_block, discover_sources, read_source};
use crate::pipeline::postprocess::{extract_contents, rewrite_link_placeholders};
use crate::pipeline::reading_time::estimate_reading_time;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Reads MyST Markdown documents into HTML fragments and metadata.
///
/// A reader holds no per-document state and is `Send + Sync`; one instance
/// can serve a whole build.
///
/// # Example
/// ```rust,no_run
/// use myst_reader::{MystReader, ReaderSettings};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = ReaderSettings::builder()
///     .extension("tasklist")
///     .calculate_reading_time(true)
///     .build()?;
/// let reader = MystReader::new(settings)?;
///
/// let output = reader.process("content/post.md")?;
/// println!("{}", output.html);
/// println!("{:?}", output.metadata.get("reading_time"));
/// # Ok(())
/// # }
/// ```
pub struct MystReader {
    settings: ReaderSettings,
    parser_config: ParserConfig,
    defaults: Defaults,
    converter: Arc<dyn Converter>,
    processor: Arc<dyn MetadataProcessor>,
}

impl fmt::Debug for MystReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MystReader")
            .field("settings", &self.settings)
            .field("parser_config", &self.parser_config)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl MystReader {
    /// Build a reader, validating extensions and converter defaults.
    ///
    /// # Errors
    /// - [`MystReaderError::UnknownExtension`] for an unrecognised extension
    /// - [`MystReaderError::DefaultsFileParse`] when a defaults file can't be read
    /// - any format error from [`validate_defaults`] when defaults files are set
    pub fn new(settings: ReaderSettings) -> Result<Self, MystReaderError> {
        let parser_config = ParserConfig::from_extensions(settings.extensions.as_slice())?;

        let defaults = load_defaults(&settings.default_files)?;
        if !settings.default_files.is_empty() {
            validate_defaults(&defaults)?;
        }

        let converter = settings
            .converter
            .clone()
            .unwrap_or_else(|| Arc::new(ComrakConverter) as Arc<dyn Converter>);
        let processor = settings
            .metadata_processor
            .clone()
            .unwrap_or_else(|| Arc::new(IdentityProcessor) as Arc<dyn MetadataProcessor>);

        debug!(
            "Reader ready: {} extensions, {} defaults files",
            parser_config.extensions().len(),
            settings.default_files.len()
        );

        Ok(Self {
            settings,
            parser_config,
            defaults,
            converter,
            processor,
        })
    }

    /// The frozen parser configuration handed to the converter.
    pub fn parser_config(&self) -> &ParserConfig {
        &self.parser_config
    }

    /// Merged converter defaults (empty when no defaults files are set).
    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    pub fn settings(&self) -> &ReaderSettings {
        &self.settings
    }

    /// Read one document from disk.
    ///
    /// Bibliographies are looked up next to `source_path`.
    ///
    /// # Errors
    /// Any failure aborts this document; there is no partial output.
    pub fn process(&self, source_path: impl AsRef<Path>) -> Result<ReadOutput, MystReaderError> {
        let source_path = source_path.as_ref();
        info!("Reading {}", source_path.display());

        // ── Step 1: Read the source ──────────────────────────────────────
        let content = read_source(source_path)?;

        self.process_content(content, || find_bibliographies(source_path))
    }

    /// Read a document held in memory. No bibliography lookup takes place.
    pub fn process_str(&self, content: &str) -> Result<ReadOutput, MystReaderError> {
        self.process_content(content.to_string(), || Ok(Vec::new()))
    }

    /// Steps 3 onwards. Step 2 (extension merge) already happened in
    /// [`MystReader::new`]. `locate_bibliographies` only runs once the
    /// front-matter check has passed.
    fn process_content<F>(
        &self,
        content: String,
        locate_bibliographies: F,
    ) -> Result<ReadOutput, MystReaderError>
    where
        F: FnOnce() -> Result<Vec<PathBuf>, MystReaderError>,
    {
        let start = Instant::now();

        // ── Step 3: Check the front-matter block ─────────────────────────
        check_metadata_block(&content)?;

        // ── Step 4: Look up and append bibliography directives ───────────
        let bibliographies = locate_bibliographies()?;
        let mut text = content.clone();
        append_bibliography_directives(&mut text, &bibliographies);
        if !bibliographies.is_empty() {
            debug!("Appended {} bibliography directives", bibliographies.len());
        }

        // ── Step 5: Convert ──────────────────────────────────────────────
        let raw = self.converter.convert(&text, &self.parser_config)?;

        // ── Step 6: Split metadata, TOC and body ─────────────────────────
        let extracted = extract_contents(&raw, true)?;

        // ── Step 7: Restore internal-link placeholders ───────────────────
        let html = rewrite_link_placeholders(&extracted.html);

        // ── Step 8: Normalise metadata ───────────────────────────────────
        let processor = self.processor.as_ref();
        let mut metadata = normalize_metadata(extracted.metadata, processor);

        // ── Step 9: Table of contents ────────────────────────────────────
        if !extracted.toc.is_empty() {
            let toc = processor.process("toc", Value::String(extracted.toc));
            metadata.insert("toc".to_string(), toc);
        }

        // ── Step 10: Reading time ────────────────────────────────────────
        if self.settings.calculate_reading_time {
            let reading_time = estimate_reading_time(&content, &self.settings.reading_speed)?;
            let reading_time = processor.process("reading_time", Value::String(reading_time));
            metadata.insert("reading_time".to_string(), reading_time);
        }

        // ── Step 11: Done ────────────────────────────────────────────────
        info!(
            "Produced {} bytes of HTML and {} metadata keys in {}ms",
            html.len(),
            metadata.len(),
            start.elapsed().as_millis()
        );
        Ok(ReadOutput { html, metadata })
    }

    /// Read every document in `paths`, continuing past failures.
    ///
    /// Each failure is logged, reported to the progress callback and kept in
    /// the returned [`BatchOutput`]; the call itself never fails.
    pub fn process_all<I, P>(&self, paths: I) -> BatchOutput
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let batch_start = Instant::now();
        let paths: Vec<PathBuf> = paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect();
        let total = paths.len();
        let cb = self.settings.progress_callback.as_ref();

        if let Some(cb) = cb {
            cb.on_batch_start(total);
        }

        let mut documents = Vec::with_capacity(total);
        let mut stats = BatchStats {
            total_documents: total,
            ..BatchStats::default()
        };

        for (i, path) in paths.into_iter().enumerate() {
            if let Some(cb) = cb {
                cb.on_document_start(&path, i + 1, total);
            }

            let start = Instant::now();
            let result = self.process(&path);
            let duration_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(output) => {
                    stats.processed_documents += 1;
                    stats.total_html_bytes += output.html.len();
                    if let Some(cb) = cb {
                        cb.on_document_complete(&path, output.html.len());
                    }
                }
                Err(e) => {
                    stats.failed_documents += 1;
                    warn!("Skipping {}: {}", path.display(), e);
                    if let Some(cb) = cb {
                        cb.on_document_error(&path, &e.to_string());
                    }
                }
            }

            documents.push(DocumentResult {
                source_path: path,
                duration_ms,
                result,
            });
        }

        stats.total_duration_ms = batch_start.elapsed().as_millis() as u64;
        info!(
            "Batch complete: {}/{} documents, {}ms total",
            stats.processed_documents, total, stats.total_duration_ms
        );

        if let Some(cb) = cb {
            cb.on_batch_complete(total, stats.processed_documents);
        }

        BatchOutput { documents, stats }
    }

    /// Discover sources under `root` with the configured file extensions and
    /// read them all.
    pub fn process_dir(&self, root: impl AsRef<Path>) -> Result<BatchOutput, MystReaderError> {
        let sources = discover_sources(root.as_ref(), self.settings.file_extensions.as_slice())?;
        Ok(self.process_all(sources))
    }

    /// Read a document and write its fragment to `output_path`.
    pub fn process_to_file(
        &self,
        source_path: impl AsRef<Path>,
        output_path: impl AsRef<Path>,
    ) -> Result<ReadOutput, MystReaderError> {
        let output = self.process(source_path)?;
        write_fragment(output_path.as_ref(), &output.html)?;
        Ok(output)
    }
}

/// Write `html` to `path` atomically (temp file + rename), creating parent
/// directories as needed.
pub fn write_fragment(path: &Path, html: &str) -> Result<(), MystReaderError> {
    let write_err = |source| MystReaderError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let written = std::fs::write(&tmp_path, html).and_then(|()| std::fs::rename(&tmp_path, path));
    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(write_err(e));
    }
    Ok(())
}
