//! Configuration types for reading MyST documents.
//!
//! Host behaviour is controlled through [`ReaderSettings`], built via its
//! [`ReaderSettingsBuilder`] or loaded from a Pelican-style YAML settings
//! file with [`ReaderSettings::from_yaml_file`]. The Markdown engine options
//! live in [`ParserConfig`], which [`crate::reader::MystReader`] derives once
//! from the settings and never mutates afterwards.

use crate::error::MystReaderError;
use crate::metadata::MetadataProcessor;
use crate::pipeline::engine::Converter;
use crate::progress::ReadProgressCallback;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Words per minute used when `READING_SPEED` is not set.
pub const DEFAULT_READING_SPEED: u32 = 200;

/// Source file extensions handled by the reader by default.
pub const DEFAULT_FILE_EXTENSIONS: &[&str] =
    &["md", "mkd", "mkdn", "mdwn", "mdown", "markdown", "Rmd"];

/// Settings for a MyST reader instance.
///
/// # Example
/// ```rust
/// use myst_reader::ReaderSettings;
///
/// let settings = ReaderSettings::builder()
///     .extension("deflist")
///     .calculate_reading_time(true)
///     .reading_speed(250)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ReaderSettings {
    /// MyST extensions to enable (`MYST_EXTENSIONS`).
    pub extensions: Vec<String>,

    /// Converter defaults files (`MYST_DEFAULT_FILES`). Validated at reader
    /// construction, otherwise not interpreted.
    pub default_files: Vec<PathBuf>,

    /// Words per minute (`READING_SPEED`). Kept as the raw host value; it is
    /// coerced to a number only when reading time is computed.
    pub reading_speed: serde_json::Value,

    /// Add `reading_time` to every document's metadata (`CALCULATE_READING_TIME`).
    pub calculate_reading_time: bool,

    /// Source extensions picked up by [`crate::pipeline::input::discover_sources`].
    pub file_extensions: Vec<String>,

    /// Markdown engine. If None, uses [`crate::pipeline::engine::ComrakConverter`].
    pub converter: Option<Arc<dyn Converter>>,

    /// Per-key metadata hook. If None, values pass through unchanged.
    pub metadata_processor: Option<Arc<dyn MetadataProcessor>>,

    /// Batch progress events.
    pub progress_callback: Option<Arc<dyn ReadProgressCallback>>,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            extensions: Vec::new(),
            default_files: Vec::new(),
            reading_speed: serde_json::Value::from(DEFAULT_READING_SPEED),
            calculate_reading_time: false,
            file_extensions: DEFAULT_FILE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            converter: None,
            metadata_processor: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ReaderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderSettings")
            .field("extensions", &self.extensions)
            .field("default_files", &self.default_files)
            .field("reading_speed", &self.reading_speed)
            .field("calculate_reading_time", &self.calculate_reading_time)
            .field("file_extensions", &self.file_extensions)
            .field("converter", &self.converter.as_ref().map(|_| "<dyn Converter>"))
            .field(
                "metadata_processor",
                &self
                    .metadata_processor
                    .as_ref()
                    .map(|_| "<dyn MetadataProcessor>"),
            )
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ReadProgressCallback>"),
            )
            .finish()
    }
}

/// On-disk shape of a settings file. Keys follow Pelican's naming.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
    #[serde(rename = "MYST_EXTENSIONS")]
    extensions: Vec<String>,
    #[serde(rename = "MYST_DEFAULT_FILES")]
    default_files: Vec<PathBuf>,
    #[serde(rename = "READING_SPEED")]
    reading_speed: Option<serde_json::Value>,
    #[serde(rename = "CALCULATE_READING_TIME")]
    calculate_reading_time: bool,
    #[serde(rename = "MYST_FILE_EXTENSIONS")]
    file_extensions: Option<Vec<String>>,
}

impl ReaderSettings {
    /// Create a new builder for `ReaderSettings`.
    pub fn builder() -> ReaderSettingsBuilder {
        ReaderSettingsBuilder {
            settings: Self::default(),
        }
    }

    /// Load settings from a YAML file.
    ///
    /// Relative `MYST_DEFAULT_FILES` entries resolve against the directory
    /// containing the settings file. Unknown keys are ignored so a full site
    /// configuration can be pointed at directly.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, MystReaderError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| MystReaderError::SettingsParse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let mut settings = Self::from_yaml_str(&text).map_err(|e| match e {
            MystReaderError::SettingsParse { detail, .. } => MystReaderError::SettingsParse {
                path: path.to_path_buf(),
                detail,
            },
            other => other,
        })?;

        if let Some(base) = path.parent() {
            settings.default_files = settings
                .default_files
                .into_iter()
                .map(|p| if p.is_relative() { base.join(p) } else { p })
                .collect();
        }
        Ok(settings)
    }

    /// Parse settings from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, MystReaderError> {
        let file: SettingsFile = if text.trim().is_empty() {
            SettingsFile::default()
        } else {
            serde_yaml::from_str(text).map_err(|e| MystReaderError::SettingsParse {
                path: PathBuf::new(),
                detail: e.to_string(),
            })?
        };

        let mut builder = Self::builder()
            .extensions(file.extensions)
            .default_files(file.default_files)
            .calculate_reading_time(file.calculate_reading_time);
        if let Some(speed) = file.reading_speed {
            builder = builder.reading_speed(speed);
        }
        if let Some(exts) = file.file_extensions {
            builder = builder.file_extensions(exts);
        }
        builder.build()
    }
}

/// Builder for [`ReaderSettings`].
#[derive(Debug)]
pub struct ReaderSettingsBuilder {
    settings: ReaderSettings,
}

impl ReaderSettingsBuilder {
    pub fn extension(mut self, name: impl Into<String>) -> Self {
        self.settings.extensions.push(name.into());
        self
    }

    pub fn extensions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings
            .extensions
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn default_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.default_files.push(path.into());
        self
    }

    pub fn default_files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.settings
            .default_files
            .extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn reading_speed(mut self, speed: impl Into<serde_json::Value>) -> Self {
        self.settings.reading_speed = speed.into();
        self
    }

    pub fn calculate_reading_time(mut self, v: bool) -> Self {
        self.settings.calculate_reading_time = v;
        self
    }

    pub fn file_extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings.file_extensions = exts.into_iter().map(Into::into).collect();
        self
    }

    pub fn converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.settings.converter = Some(converter);
        self
    }

    pub fn metadata_processor(mut self, processor: Arc<dyn MetadataProcessor>) -> Self {
        self.settings.metadata_processor = Some(processor);
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn ReadProgressCallback>) -> Self {
        self.settings.progress_callback = Some(cb);
        self
    }

    /// Build the settings, validating constraints.
    pub fn build(self) -> Result<ReaderSettings, MystReaderError> {
        let s = &self.settings;
        if s.file_extensions.is_empty() {
            return Err(MystReaderError::InvalidConfig(
                "At least one source file extension is required".into(),
            ));
        }
        if let Some(bad) = s
            .file_extensions
            .iter()
            .find(|e| e.is_empty() || e.starts_with('.'))
        {
            return Err(MystReaderError::InvalidConfig(format!(
                "File extensions are given without a leading dot, got '{bad}'"
            )));
        }
        Ok(self.settings)
    }
}

// ── Parser configuration ─────────────────────────────────────────────────

/// MyST syntax extensions that can be switched on through `MYST_EXTENSIONS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MystExtension {
    Amsmath,
    AttrsInline,
    ColonFence,
    Deflist,
    Dollarmath,
    Fieldlist,
    HtmlAdmonition,
    HtmlImage,
    Linkify,
    Replacements,
    Smartquotes,
    Strikethrough,
    Substitution,
    Tasklist,
}

impl MystExtension {
    pub fn as_str(self) -> &'static str {
        match self {
            MystExtension::Amsmath => "amsmath",
            MystExtension::AttrsInline => "attrs_inline",
            MystExtension::ColonFence => "colon_fence",
            MystExtension::Deflist => "deflist",
            MystExtension::Dollarmath => "dollarmath",
            MystExtension::Fieldlist => "fieldlist",
            MystExtension::HtmlAdmonition => "html_admonition",
            MystExtension::HtmlImage => "html_image",
            MystExtension::Linkify => "linkify",
            MystExtension::Replacements => "replacements",
            MystExtension::Smartquotes => "smartquotes",
            MystExtension::Strikethrough => "strikethrough",
            MystExtension::Substitution => "substitution",
            MystExtension::Tasklist => "tasklist",
        }
    }
}

impl FromStr for MystExtension {
    type Err = MystReaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ext = match s.trim() {
            "amsmath" => MystExtension::Amsmath,
            "attrs_inline" => MystExtension::AttrsInline,
            "colon_fence" => MystExtension::ColonFence,
            "deflist" => MystExtension::Deflist,
            "dollarmath" => MystExtension::Dollarmath,
            "fieldlist" => MystExtension::Fieldlist,
            "html_admonition" => MystExtension::HtmlAdmonition,
            "html_image" => MystExtension::HtmlImage,
            "linkify" => MystExtension::Linkify,
            "replacements" => MystExtension::Replacements,
            "smartquotes" => MystExtension::Smartquotes,
            "strikethrough" => MystExtension::Strikethrough,
            "substitution" => MystExtension::Substitution,
            "tasklist" => MystExtension::Tasklist,
            other => return Err(MystReaderError::UnknownExtension(other.to_string())),
        };
        Ok(ext)
    }
}

impl fmt::Display for MystExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Frozen Markdown engine configuration shared by every document a reader
/// processes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserConfig {
    extensions: Vec<MystExtension>,
}

impl ParserConfig {
    /// Parse extension names, keeping first-seen order and dropping duplicates.
    pub fn from_extensions<S: AsRef<str>>(names: &[S]) -> Result<Self, MystReaderError> {
        let mut extensions = Vec::with_capacity(names.len());
        for name in names {
            let ext: MystExtension = name.as_ref().parse()?;
            if !extensions.contains(&ext) {
                extensions.push(ext);
            }
        }
        Ok(Self { extensions })
    }

    /// Enabled extensions in configuration order.
    pub fn extensions(&self) -> &[MystExtension] {
        &self.extensions
    }

    pub fn is_enabled(&self, ext: MystExtension) -> bool {
        self.extensions.contains(&ext)
    }
}
