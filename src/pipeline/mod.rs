//! Pipeline stages for MyST-to-HTML reading.
//!
//! Each submodule implements exactly one step of
//! [`crate::reader::MystReader::process`]. Keeping them apart means every
//! check can be tested without a Markdown engine, and the engine itself can
//! be swapped without touching the checks around it.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ bibliography ──▶ engine ──▶ postprocess ──▶ reading_time
//! (file)     (directives)    (convert)   (toc, links)    (optional)
//! ```
//!
//! 1. [`input`]: read the source and verify its front-matter block
//! 2. [`bibliography`]: find sibling bibliography files and append directives
//! 3. [`engine`]: the single call into the Markdown converter
//! 4. [`postprocess`]: split metadata from HTML, lift the TOC, fix links
//! 5. [`reading_time`]: word count turned into "N minutes"
//!
//! [`formats`] validates converter defaults once, when a reader is built.

pub mod bibliography;
pub mod engine;
pub mod formats;
pub mod input;
pub mod postprocess;
pub mod reading_time;
