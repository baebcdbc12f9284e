//! Post-processing: turn raw converter output into a fragment plus metadata.
//!
//! The converter hands back one string: a JSON metadata record on the first
//! line, then an HTML body. This module splits the two apart, lifts the
//! table of contents out of the body, and unwraps the `<body>` so callers get
//! a fragment they can drop into a template.
//!
//! ## Step Order
//!
//! The JSON line is decoded before anything touches the HTML. Output that has
//! already been post-processed has no JSON line, so feeding it back in fails
//! immediately instead of producing a mangled fragment.

use crate::error::MystReaderError;
use kuchikikiki::traits::TendrilSink;
use kuchikikiki::NodeRef;
use serde_json::{Map, Value};

/// Identifier the converter gives its table-of-contents `<nav>`.
pub const TOC_ID: &str = "TOC";

/// Encoded internal-link markers and their raw forms.
///
/// The converter percent-encodes braces inside URLs; the site generator only
/// recognises the raw `{static}`, `{attach}` and `{filename}` prefixes.
pub const ENCODED_LINK_PLACEHOLDERS: [(&str, &str); 3] = [
    ("%7Bstatic%7D", "{static}"),
    ("%7Battach%7D", "{attach}"),
    ("%7Bfilename%7D", "{filename}"),
];

/// Result of [`extract_contents`].
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    /// Body HTML with the `<body>` wrapper and TOC removed, trimmed.
    pub html: String,
    /// The TOC `<nav>` re-tagged with `class="toc"`, or empty.
    pub toc: String,
    /// Decoded first-line metadata.
    pub metadata: Map<String, Value>,
}

/// Split converter output into body HTML, TOC and metadata.
///
/// Fails with [`MystReaderError::MetadataDecode`] when the first line is not
/// a JSON object.
pub fn extract_contents(raw: &str, table_of_contents: bool) -> Result<Extracted, MystReaderError> {
    // ── Step 1: Decode the metadata line ─────────────────────────────────
    let (json_line, html) = raw.split_once('\n').unwrap_or((raw, ""));
    let metadata: Map<String, Value> = serde_json::from_str(json_line)
        .map_err(|source| MystReaderError::MetadataDecode { source })?;

    // ── Step 2: Parse the body ───────────────────────────────────────────
    let document = kuchikikiki::parse_html().one(html);
    let Ok(body) = document.select_first("body") else {
        // html5ever always synthesises a body; keep going with nothing in it.
        return Ok(Extracted {
            html: String::new(),
            toc: String::new(),
            metadata,
        });
    };
    let body = body.as_node();

    // ── Step 3: Lift out the TOC ─────────────────────────────────────────
    let mut toc = String::new();
    if table_of_contents {
        if let Some(nav) = find_toc(body) {
            toc = serialize_node(&nav)?.replacen(
                &format!("id=\"{TOC_ID}\""),
                "class=\"toc\"",
                1,
            );
            nav.detach();
        }
    }

    // ── Steps 4–5: Unwrap the body and trim ──────────────────────────────
    let mut fragment = String::new();
    for child in body.children() {
        fragment.push_str(&serialize_node(&child)?);
    }

    Ok(Extracted {
        html: fragment.trim().to_string(),
        toc,
        metadata,
    })
}

/// Replace every encoded link placeholder with its raw form.
pub fn rewrite_link_placeholders(html: &str) -> String {
    ENCODED_LINK_PLACEHOLDERS
        .iter()
        .fold(html.to_string(), |acc, (encoded, raw)| acc.replace(encoded, raw))
}

/// First `<nav>` under `body` whose id is exactly [`TOC_ID`].
fn find_toc(body: &NodeRef) -> Option<NodeRef> {
    body.select("nav").ok()?.find_map(|nav| {
        let is_toc = nav.attributes.borrow().get("id") == Some(TOC_ID);
        is_toc.then(|| nav.as_node().clone())
    })
}

pub(crate) fn serialize_node(node: &NodeRef) -> Result<String, MystReaderError> {
    let mut out = Vec::new();
    node.serialize(&mut out)
        .map_err(|e| MystReaderError::ConversionFailed(format!("HTML serialisation failed: {e}")))?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}
