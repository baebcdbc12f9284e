//! Output types returned by the reader.

use crate::error::MystReaderError;
use crate::metadata::Metadata;
use serde::Serialize;
use std::path::PathBuf;

/// One converted document: an HTML fragment and its metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadOutput {
    /// HTML fragment without `<body>` wrapper or TOC.
    pub html: String,
    /// Lower-cased, cleaned metadata. May carry `toc` and `reading_time`.
    pub metadata: Metadata,
}

impl ReadOutput {
    /// The extracted table of contents, if the document had one.
    pub fn toc(&self) -> Option<&str> {
        self.metadata.get("toc").and_then(|v| v.as_str())
    }

    pub fn reading_time(&self) -> Option<&str> {
        self.metadata.get("reading_time").and_then(|v| v.as_str())
    }
}

/// Outcome of one document within a batch.
#[derive(Debug)]
pub struct DocumentResult {
    pub source_path: PathBuf,
    /// Wall-clock time spent on this document.
    pub duration_ms: u64,
    pub result: Result<ReadOutput, MystReaderError>,
}

impl DocumentResult {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Statistics about a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub total_documents: usize,
    pub processed_documents: usize,
    pub failed_documents: usize,
    /// Sum of fragment byte lengths over successful documents.
    pub total_html_bytes: usize,
    pub total_duration_ms: u64,
}

/// Everything [`crate::reader::MystReader::process_all`] produced.
#[derive(Debug, Default)]
pub struct BatchOutput {
    /// One entry per input path, in input order.
    pub documents: Vec<DocumentResult>,
    pub stats: BatchStats,
}

impl BatchOutput {
    /// Documents that failed, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&PathBuf, &MystReaderError)> {
        self.documents
            .iter()
            .filter_map(|d| d.result.as_ref().err().map(|e| (&d.source_path, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accessors() {
        let mut metadata = Metadata::new();
        metadata.insert("toc".into(), json!("<nav class=\"toc\"></nav>"));
        metadata.insert("reading_time".into(), json!("1 minute"));
        let out = ReadOutput {
            html: "<p>x</p>".into(),
            metadata,
        };
        assert_eq!(out.toc(), Some("<nav class=\"toc\"></nav>"));
        assert_eq!(out.reading_time(), Some("1 minute"));
    }

    #[test]
    fn serializes_as_html_and_metadata() {
        let out = ReadOutput {
            html: "<p>x</p>".into(),
            metadata: Metadata::new(),
        };
        assert_eq!(
            serde_json::to_value(&out).unwrap(),
            json!({"html": "<p>x</p>", "metadata": {}})
        );
    }

    #[test]
    fn failures_lists_errors_only() {
        let batch = BatchOutput {
            documents: vec![
                DocumentResult {
                    source_path: "a.md".into(),
                    duration_ms: 1,
                    result: Ok(ReadOutput {
                        html: String::new(),
                        metadata: Metadata::new(),
                    }),
                },
                DocumentResult {
                    source_path: "b.md".into(),
                    duration_ms: 1,
                    result: Err(MystReaderError::EmptyDocument),
                },
            ],
            stats: BatchStats::default(),
        };
        let failures: Vec<_> = batch.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, &PathBuf::from("b.md"));
    }
}
