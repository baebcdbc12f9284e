//! Error types for the myst-reader library.
//!
//! Every failure is terminal for the document being read: the pipeline does
//! no partial recovery, and a failing document produces no output. The
//! variants fall into three groups:
//!
//! * **Malformed metadata**: the source has no usable front-matter block
//!   ([`MystReaderError::is_malformed_metadata`]).
//! * **Configuration**: the host settings or converter defaults are invalid
//!   ([`MystReaderError::is_configuration_error`]).
//! * **Environment**: file-system and converter failures.
//!
//! The batch runner in [`crate::reader`] records these per document and moves
//! on; everything else propagates them to the caller unchanged.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which side of the converter a format option applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatDirection {
    /// `reader` / `from` keys.
    Input,
    /// `writer` / `to` keys.
    Output,
}

impl FormatDirection {
    /// The two mutually exclusive keys selecting this format, in message order.
    pub fn keys(self) -> (&'static str, &'static str) {
        match self {
            FormatDirection::Input => ("from", "reader"),
            FormatDirection::Output => ("to", "writer"),
        }
    }

    fn conflict_message(self) -> &'static str {
        match self {
            FormatDirection::Input => {
                "Specifying both from and reader is not supported. Please specify just one."
            }
            FormatDirection::Output => {
                "Specifying both to and writer is not supported. Please specify just one."
            }
        }
    }

    fn unsupported_message(self) -> &'static str {
        match self {
            FormatDirection::Input => "Input type has to be a Markdown variant.",
            FormatDirection::Output => "Output format type must be either html or html5.",
        }
    }
}

impl fmt::Display for FormatDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatDirection::Input => f.write_str("input"),
            FormatDirection::Output => f.write_str("output"),
        }
    }
}

/// All errors returned by the myst-reader library.
#[derive(Debug, Error)]
pub enum MystReaderError {
    // ── Front matter ──────────────────────────────────────────────────────
    /// The document has no content at all.
    #[error("Could not find metadata. File is empty.")]
    EmptyDocument,

    /// The first line is not a `---` delimiter.
    #[error("Could not find metadata header '---'.")]
    MissingMetadataHeader,

    /// No closing `---` or `...` line follows the opening delimiter.
    #[error("Could not find end of metadata block.")]
    UnterminatedMetadataBlock,

    // ── Converter defaults ────────────────────────────────────────────────
    /// Both mutually exclusive format keys were set.
    #[error("{}", .direction.conflict_message())]
    ConflictingFormatOption { direction: FormatDirection },

    /// Neither `reader` nor `from` was set.
    #[error("No input format specified.")]
    MissingFormatOption,

    /// The declared format is not an accepted variant.
    #[error("{}", .direction.unsupported_message())]
    UnsupportedFormat {
        direction: FormatDirection,
        format: String,
    },

    /// A boolean converter default that must stay off was switched on.
    #[error("The default {key} should be set to false.")]
    InvalidDefaultOption { key: String },

    /// A defaults file could not be read or is not a YAML mapping.
    #[error("Could not load defaults file '{path}': {detail}")]
    DefaultsFileParse { path: PathBuf, detail: String },

    // ── Reader settings ───────────────────────────────────────────────────
    /// `READING_SPEED` could not be coerced to a positive number.
    #[error("READING_SPEED setting must be a number.")]
    ReadingSpeedConfiguration { value: String },

    /// `MYST_EXTENSIONS` names an extension the reader does not know.
    #[error("Unknown MyST extension '{0}'")]
    UnknownExtension(String),

    /// The settings file could not be parsed.
    #[error("Could not parse settings file '{path}': {detail}")]
    SettingsParse { path: PathBuf, detail: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Converter ─────────────────────────────────────────────────────────
    /// The first line of converter output is not a JSON object.
    #[error("Could not decode converter metadata: {source}")]
    MetadataDecode {
        #[source]
        source: serde_json::Error,
    },

    /// The Markdown engine rejected the document.
    #[error("Markdown conversion failed: {0}")]
    ConversionFailed(String),

    // ── I/O ───────────────────────────────────────────────────────────────
    /// Source file was not found at the given path.
    #[error("Source file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// Source file is not valid UTF-8.
    #[error("Source file '{path}' is not valid UTF-8")]
    InvalidEncoding { path: PathBuf },

    /// Directory walk or read failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MystReaderError {
    /// True for the three front-matter failures.
    pub fn is_malformed_metadata(&self) -> bool {
        matches!(
            self,
            MystReaderError::EmptyDocument
                | MystReaderError::MissingMetadataHeader
                | MystReaderError::UnterminatedMetadataBlock
        )
    }

    /// True for failures caused by host settings or converter defaults.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            MystReaderError::ConflictingFormatOption { .. }
                | MystReaderError::MissingFormatOption
                | MystReaderError::UnsupportedFormat { .. }
                | MystReaderError::InvalidDefaultOption { .. }
                | MystReaderError::DefaultsFileParse { .. }
                | MystReaderError::ReadingSpeedConfiguration { .. }
                | MystReaderError::UnknownExtension(_)
                | MystReaderError::SettingsParse { .. }
                | MystReaderError::InvalidConfig(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicting_input_display() {
        let e = MystReaderError::ConflictingFormatOption {
            direction: FormatDirection::Input,
        };
        assert_eq!(
            e.to_string(),
            "Specifying both from and reader is not supported. Please specify just one."
        );
    }

    #[test]
    fn conflicting_output_display() {
        let e = MystReaderError::ConflictingFormatOption {
            direction: FormatDirection::Output,
        };
        assert_eq!(
            e.to_string(),
            "Specifying both to and writer is not supported. Please specify just one."
        );
    }

    #[test]
    fn unsupported_format_display() {
        let input = MystReaderError::UnsupportedFormat {
            direction: FormatDirection::Input,
            format: "rst".into(),
        };
        assert!(input.to_string().contains("Markdown variant"));

        let output = MystReaderError::UnsupportedFormat {
            direction: FormatDirection::Output,
            format: "latex".into(),
        };
        assert!(output.to_string().contains("html or html5"));
    }

    #[test]
    fn classification() {
        assert!(MystReaderError::EmptyDocument.is_malformed_metadata());
        assert!(MystReaderError::UnterminatedMetadataBlock.is_malformed_metadata());
        assert!(!MystReaderError::MissingFormatOption.is_malformed_metadata());
        assert!(MystReaderError::MissingFormatOption.is_configuration_error());
        assert!(MystReaderError::ReadingSpeedConfiguration {
            value: "fast".into()
        }
        .is_configuration_error());
        assert!(!MystReaderError::MissingMetadataHeader.is_configuration_error());
    }

    #[test]
    fn reading_speed_display() {
        let e = MystReaderError::ReadingSpeedConfiguration {
            value: "fast".into(),
        };
        assert_eq!(e.to_string(), "READING_SPEED setting must be a number.");
    }
}
