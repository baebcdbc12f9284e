//! Source input: read documents from disk and check their front matter.
//!
//! The reader only verifies that a front-matter block is present. Parsing
//! the YAML inside it is the converter's job; a document that fails here
//! never reaches the converter.

use crate::error::MystReaderError;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Opening delimiter of a front-matter block.
pub const METADATA_DELIMITER: &str = "---";

/// Accepted closing delimiters.
pub const METADATA_TERMINATORS: [&str; 2] = ["---", "..."];

/// A located front-matter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataBlock<'a> {
    /// YAML between the delimiters, without the delimiter lines.
    pub yaml: &'a str,
    /// Everything after the closing delimiter line.
    pub body: &'a str,
}

/// Read a source document as UTF-8, dropping a leading byte-order mark.
pub fn read_source(path: &Path) -> Result<String, MystReaderError> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(MystReaderError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(MystReaderError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(MystReaderError::Io {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    let mut text = String::from_utf8(bytes).map_err(|_| MystReaderError::InvalidEncoding {
        path: path.to_path_buf(),
    })?;
    if text.starts_with('\u{FEFF}') {
        text.drain(..'\u{FEFF}'.len_utf8());
    }

    debug!("Read {} bytes from {}", text.len(), path.display());
    Ok(text)
}

/// Check that `content` starts with a terminated front-matter block.
pub fn check_metadata_block(content: &str) -> Result<(), MystReaderError> {
    split_metadata_block(content).map(|_| ())
}

/// Locate the front-matter block and split it from the document body.
///
/// Fails with [`MystReaderError::EmptyDocument`],
/// [`MystReaderError::MissingMetadataHeader`] or
/// [`MystReaderError::UnterminatedMetadataBlock`].
pub fn split_metadata_block(content: &str) -> Result<MetadataBlock<'_>, MystReaderError> {
    if content.is_empty() {
        return Err(MystReaderError::EmptyDocument);
    }

    let mut lines = content.split_inclusive('\n');
    let first = lines.next().unwrap_or_default();
    if first.trim_end() != METADATA_DELIMITER {
        return Err(MystReaderError::MissingMetadataHeader);
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if METADATA_TERMINATORS.contains(&line.trim_end()) {
            return Ok(MetadataBlock {
                yaml: &content[yaml_start..offset],
                body: &content[offset + line.len()..],
            });
        }
        offset += line.len();
    }

    Err(MystReaderError::UnterminatedMetadataBlock)
}

/// Recursively collect source files under `root` whose extension is one of
/// `extensions` (compared case-sensitively), sorted by path.
///
/// A `root` that is itself a file is returned as-is.
pub fn discover_sources<S: AsRef<str>>(
    root: &Path,
    extensions: &[S],
) -> Result<Vec<PathBuf>, MystReaderError> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut sources = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| extensions.iter().any(|allowed| allowed.as_ref() == ext));
        if matches {
            sources.push(entry.into_path());
        }
    }

    debug!("Discovered {} sources under {}", sources.len(), root.display());
    Ok(sources)
}

/// Convert a `walkdir` failure into an I/O error naming the offending path.
pub(crate) fn walk_error(root: &Path, e: walkdir::Error) -> MystReaderError {
    let path = e.path().unwrap_or(root).to_path_buf();
    let source = e
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("directory loop detected"));
    MystReaderError::Io { path, source }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content() {
        assert!(matches!(
            check_metadata_block(""),
            Err(MystReaderError::EmptyDocument)
        ));
    }

    #[test]
    fn missing_header() {
        assert!(matches!(
            check_metadata_block("title: x\n---\nBody"),
            Err(MystReaderError::MissingMetadataHeader)
        ));
        assert!(matches!(
            check_metadata_block("# Heading\n"),
            Err(MystReaderError::MissingMetadataHeader)
        ));
    }

    #[test]
    fn header_must_be_exact() {
        assert!(matches!(
            check_metadata_block("----\ntitle: x\n---\n"),
            Err(MystReaderError::MissingMetadataHeader)
        ));
        assert!(matches!(
            check_metadata_block(" ---\ntitle: x\n---\n"),
            Err(MystReaderError::MissingMetadataHeader)
        ));
    }

    #[test]
    fn trailing_whitespace_on_delimiters() {
        let block = split_metadata_block("---  \ntitle: x\n---\t\r\nBody\n").unwrap();
        assert_eq!(block.yaml, "title: x\n");
        assert_eq!(block.body, "Body\n");
    }

    #[test]
    fn unterminated() {
        assert!(matches!(
            check_metadata_block("---\ntitle: x\n\nBody text\n"),
            Err(MystReaderError::UnterminatedMetadataBlock)
        ));
        assert!(matches!(
            check_metadata_block("---"),
            Err(MystReaderError::UnterminatedMetadataBlock)
        ));
    }

    #[test]
    fn dots_terminate() {
        let block = split_metadata_block("---\ntitle: x\n...\n# Body").unwrap();
        assert_eq!(block.yaml, "title: x\n");
        assert_eq!(block.body, "# Body");
    }

    #[test]
    fn empty_block_is_terminated() {
        let block = split_metadata_block("---\n---\nBody").unwrap();
        assert_eq!(block.yaml, "");
        assert_eq!(block.body, "Body");
    }

    #[test]
    fn read_source_strips_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bom.md");
        std::fs::write(&path, "\u{FEFF}---\ntitle: x\n---\n").unwrap();
        let text = read_source(&path).unwrap();
        assert!(text.starts_with("---"));
    }

    #[test]
    fn read_source_missing_file() {
        let err = read_source(Path::new("/definitely/not/here.md")).unwrap_err();
        assert!(matches!(err, MystReaderError::FileNotFound { .. }));
    }

    #[test]
    fn read_source_rejects_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.md");
        std::fs::write(&path, [0x2d, 0x2d, 0x2d, 0x0a, 0xe9, 0x0a]).unwrap();
        let err = read_source(&path).unwrap_err();
        assert!(matches!(err, MystReaderError::InvalidEncoding { .. }));
    }

    #[test]
    fn discover_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        for name in ["b.md", "a.Rmd", "notes.txt", "sub/c.markdown", "x.MD"] {
            std::fs::write(dir.path().join(name), "---\n---\n").unwrap();
        }

        let found = discover_sources(dir.path(), &["md", "Rmd", "markdown"]).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.Rmd", "b.md", "sub/c.markdown"]);
    }

    #[test]
    fn discover_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("post.txt");
        std::fs::write(&path, "").unwrap();
        assert_eq!(discover_sources(&path, &["md"]).unwrap(), vec![path]);
    }
}
