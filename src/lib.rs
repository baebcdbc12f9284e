//! # myst-reader
//!
//! Read MyST-flavoured Markdown documents into HTML5 fragments plus a
//! metadata record, ready for a static-site generator's templates.
//!
//! ## Pipeline Overview
//!
//! ```text
//! post.md
//!  │
//!  ├─ 1. Input        read UTF-8, require a `---` front-matter block
//!  ├─ 2. Bibliography append `{bibliography}` directives for post.bib & co.
//!  ├─ 3. Convert      Markdown engine → `<json>\n<body>…</body>`
//!  ├─ 4. Postprocess  decode metadata, lift `<nav id="TOC">`, unwrap body,
//!  │                  restore `{static}`/`{attach}`/`{filename}` links
//!  ├─ 5. Metadata     lower-case keys, strip quotes, host hook per key
//!  └─ 6. Extras       `toc` and optional `reading_time`
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use myst_reader::{MystReader, ReaderSettings};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = ReaderSettings::from_yaml_file("pelicanconf.yaml")?;
//!     let reader = MystReader::new(settings)?;
//!     let output = reader.process("content/post.md")?;
//!     println!("{}", output.html);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `myst2html` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! myst-reader = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod reader;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{MystExtension, ParserConfig, ReaderSettings, ReaderSettingsBuilder};
pub use error::{FormatDirection, MystReaderError};
pub use metadata::{IdentityProcessor, ListSplitProcessor, Metadata, MetadataProcessor};
pub use output::{BatchOutput, BatchStats, DocumentResult, ReadOutput};
pub use pipeline::engine::{ComrakConverter, Converter};
pub use progress::{NoopProgressCallback, ReadProgressCallback};
pub use reader::{write_fragment, MystReader};
