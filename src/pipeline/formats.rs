//! Converter defaults: loading and format validation.
//!
//! Defaults files are flat YAML mappings in the style of a Pandoc defaults
//! file. The reader never interprets them beyond these checks; they exist so
//! a site can't silently be configured to read non-Markdown input or emit
//! something other than an HTML fragment.

use crate::error::{FormatDirection, MystReaderError};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A merged defaults record.
pub type Defaults = Map<String, Value>;

/// Markdown variants accepted as converter input.
pub const VALID_INPUT_FORMATS: [&str; 7] = [
    "commonmark",
    "commonmark_x",
    "gfm",
    "markdown",
    "markdown_mmd",
    "markdown_phpextra",
    "markdown_strict",
];

/// Accepted converter output formats.
pub const VALID_OUTPUT_FORMATS: [&str; 2] = ["html", "html5"];

/// Boolean defaults that would make the converter emit a full document.
const MUST_BE_FALSE: [&str; 2] = ["standalone", "self-contained"];

/// Fetch a format key, treating missing, null and empty values as unset.
fn format_option(defaults: &Defaults, key: &str) -> Option<String> {
    match defaults.get(key)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Validate the input format and return it as declared.
///
/// Variant suffixes (`markdown+smart`, `gfm-raw_html`) are ignored when
/// matching against [`VALID_INPUT_FORMATS`].
pub fn check_input_format(defaults: &Defaults) -> Result<String, MystReaderError> {
    let (from_key, reader_key) = FormatDirection::Input.keys();
    let format = match (
        format_option(defaults, reader_key),
        format_option(defaults, from_key),
    ) {
        (None, None) => return Err(MystReaderError::MissingFormatOption),
        (Some(_), Some(_)) => {
            return Err(MystReaderError::ConflictingFormatOption {
                direction: FormatDirection::Input,
            });
        }
        (Some(f), None) | (None, Some(f)) => f,
    };

    let base = format.split(['+', '-']).next().unwrap_or_default();
    if !VALID_INPUT_FORMATS.contains(&base) {
        return Err(MystReaderError::UnsupportedFormat {
            direction: FormatDirection::Input,
            format,
        });
    }
    Ok(format)
}

/// Validate that exactly one output key selects an HTML writer.
pub fn check_output_format(defaults: &Defaults) -> Result<(), MystReaderError> {
    let (to_key, writer_key) = FormatDirection::Output.keys();
    let writer = format_option(defaults, writer_key);
    let to = format_option(defaults, to_key);

    if writer.is_some() && to.is_some() {
        return Err(MystReaderError::ConflictingFormatOption {
            direction: FormatDirection::Output,
        });
    }

    let accepted = |v: &Option<String>| {
        v.as_deref()
            .is_some_and(|f| VALID_OUTPUT_FORMATS.contains(&f))
    };
    if !accepted(&writer) && !accepted(&to) {
        return Err(MystReaderError::UnsupportedFormat {
            direction: FormatDirection::Output,
            format: writer.or(to).unwrap_or_default(),
        });
    }
    Ok(())
}

/// Reject defaults that would wrap output in a standalone document.
pub fn check_fragment_options(defaults: &Defaults) -> Result<(), MystReaderError> {
    for key in MUST_BE_FALSE {
        if defaults.get(key).and_then(Value::as_bool) == Some(true) {
            return Err(MystReaderError::InvalidDefaultOption {
                key: key.to_string(),
            });
        }
    }
    Ok(())
}

/// Run every defaults check.
pub fn validate_defaults(defaults: &Defaults) -> Result<(), MystReaderError> {
    check_fragment_options(defaults)?;
    let input = check_input_format(defaults)?;
    check_output_format(defaults)?;
    debug!("Converter defaults accepted (input format: {input})");
    Ok(())
}

/// Load and merge defaults files in order; later files override earlier keys.
pub fn load_defaults(paths: &[PathBuf]) -> Result<Defaults, MystReaderError> {
    let mut merged = Defaults::new();
    for path in paths {
        merged.extend(load_defaults_file(path)?);
    }
    Ok(merged)
}

fn load_defaults_file(path: &Path) -> Result<Defaults, MystReaderError> {
    let parse_err = |detail: String| MystReaderError::DefaultsFileParse {
        path: path.to_path_buf(),
        detail,
    };

    let text = std::fs::read_to_string(path).map_err(|e| parse_err(e.to_string()))?;
    if text.trim().is_empty() {
        return Ok(Defaults::new());
    }
    match serde_yaml::from_str::<Value>(&text).map_err(|e| parse_err(e.to_string()))? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Defaults::new()),
        _ => Err(parse_err("expected a mapping at the top level".into())),
    }
}
