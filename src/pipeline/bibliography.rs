//! Bibliography discovery and directive injection.
//!
//! A document `paper.md` picks up every `paper.bib`, `paper.bibtex`,
//! `paper.json` and `paper.yaml` found anywhere under its own directory. Each
//! match is appended to the source as a MyST `{bibliography}` directive so the
//! converter renders it after the content.

use crate::error::MystReaderError;
use crate::pipeline::input::walk_error;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Bibliography file extensions, without the dot.
pub const BIBLIOGRAPHY_EXTENSIONS: [&str; 4] = ["json", "yaml", "bibtex", "bib"];

/// Find bibliography files sharing `source_path`'s base name.
///
/// The walk is rooted at the source's directory and descends into every
/// subdirectory. Results are absolute and sorted by path so that documents
/// with several bibliographies render identically on every platform.
pub fn find_bibliographies(source_path: &Path) -> Result<Vec<PathBuf>, MystReaderError> {
    let Some(stem) = source_path.file_stem().and_then(|s| s.to_str()) else {
        return Ok(Vec::new());
    };

    let absolute = std::path::absolute(source_path).map_err(|e| MystReaderError::Io {
        path: source_path.to_path_buf(),
        source: e,
    })?;
    let directory = absolute.parent().unwrap_or(Path::new("/"));

    let wanted: Vec<String> = BIBLIOGRAPHY_EXTENSIONS
        .iter()
        .map(|ext| format!("{stem}.{ext}"))
        .collect();

    let mut found = Vec::new();
    for entry in WalkDir::new(directory) {
        let entry = entry.map_err(|e| walk_error(directory, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_match = entry
            .file_name()
            .to_str()
            .is_some_and(|name| wanted.iter().any(|w| w == name));
        if is_match {
            found.push(entry.into_path());
        }
    }
    found.sort();

    debug!(
        "Found {} bibliographies for {}",
        found.len(),
        source_path.display()
    );
    Ok(found)
}

/// Render the directive block for one bibliography file.
pub fn bibliography_directive(path: &Path) -> String {
    format!("\n\n```{{bibliography}} {}\n```\n\n", path.display())
}

/// Append one directive block per bibliography to `content`.
pub fn append_bibliography_directives(content: &mut String, bibliographies: &[PathBuf]) {
    for bib in bibliographies {
        content.push_str(&bibliography_directive(bib));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn directive_format() {
        assert_eq!(
            bibliography_directive(Path::new("/site/content/paper.bib")),
            "\n\n```{bibliography} /site/content/paper.bib\n```\n\n"
        );
    }

    #[test]
    fn finds_sibling_and_nested() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("refs")).unwrap();
        fs::write(root.join("paper.md"), "").unwrap();
        fs::write(root.join("paper.bib"), "").unwrap();
        fs::write(root.join("refs/paper.json"), "").unwrap();
        fs::write(root.join("other.bib"), "").unwrap();
        fs::write(root.join("paper.txt"), "").unwrap();

        let found = find_bibliographies(&root.join("paper.md")).unwrap();
        assert_eq!(found, vec![root.join("paper.bib"), root.join("refs/paper.json")]);
        assert!(found.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn ordering_is_lexicographic() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for ext in ["yaml", "json", "bibtex", "bib"] {
            fs::write(root.join(format!("paper.{ext}")), "").unwrap();
        }
        let found = find_bibliographies(&root.join("paper.md")).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["paper.bib", "paper.bibtex", "paper.json", "paper.yaml"]);
    }

    #[test]
    fn none_found() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("paper.md"), "").unwrap();
        assert!(find_bibliographies(&dir.path().join("paper.md"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn appends_in_order() {
        let mut content = String::from("---\n---\nBody");
        append_bibliography_directives(
            &mut content,
            &[PathBuf::from("/a/x.bib"), PathBuf::from("/a/x.json")],
        );
        assert_eq!(content.matches("```{bibliography}").count(), 2);
        assert!(content.find("/a/x.bib").unwrap() < content.find("/a/x.json").unwrap());
        assert!(content.starts_with("---\n---\nBody\n\n```"));
    }
}
