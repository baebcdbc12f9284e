//! The Markdown engine boundary.
//!
//! [`Converter`] is the only place a document touches a Markdown
//! implementation. The reader hands it the (possibly bibliography-augmented)
//! source and the frozen [`ParserConfig`], and expects back one string: a
//! JSON object on the first line followed by an HTML document body that may
//! contain a `<nav id="TOC">`.
//!
//! [`ComrakConverter`] is the bundled engine. Tests and hosts with their own
//! toolchain inject a different implementation through
//! [`crate::config::ReaderSettingsBuilder::converter`].

use crate::config::{MystExtension, ParserConfig};
use crate::error::MystReaderError;
use crate::pipeline::input::split_metadata_block;
use crate::pipeline::postprocess::{serialize_node, TOC_ID};
use comrak::{markdown_to_html, Options};
use kuchikikiki::traits::TendrilSink;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;

/// Converts Markdown source to `<json metadata>\n<html body>`.
pub trait Converter: Send + Sync {
    fn convert(&self, text: &str, config: &ParserConfig) -> Result<String, MystReaderError>;
}

/// Markdown engine backed by `comrak`.
///
/// * front matter is parsed as YAML and emitted as the JSON line;
/// * `{bibliography}` directive fences become bibliography placeholder blocks;
/// * headings receive unique slug ids and feed a nested `<nav id="TOC">`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ComrakConverter;

impl Converter for ComrakConverter {
    fn convert(&self, text: &str, config: &ParserConfig) -> Result<String, MystReaderError> {
        let block = split_metadata_block(text)?;
        let metadata = parse_front_matter(block.yaml)?;
        let body = render_directives(block.body);

        let options = comrak_options(config);
        let html = markdown_to_html(&body, &options);
        let (html, toc) = anchor_headings(&html)?;

        let json = serde_json::to_string(&Value::Object(metadata))
            .map_err(|e| MystReaderError::ConversionFailed(e.to_string()))?;
        Ok(format!("{json}\n<body>\n{toc}{html}</body>\n"))
    }
}

/// Map enabled MyST extensions onto comrak options.
///
/// Tables and footnotes are part of MyST's base syntax and always on.
/// Extensions without a comrak counterpart are accepted and have no effect.
fn comrak_options(config: &ParserConfig) -> Options<'static> {
    let mut options = Options::default();
    options.extension.table = true;
    options.extension.footnotes = true;
    options.render.r#unsafe = true;

    for ext in config.extensions() {
        match ext {
            MystExtension::Deflist => options.extension.description_lists = true,
            MystExtension::Dollarmath | MystExtension::Amsmath => {
                options.extension.math_dollars = true
            }
            MystExtension::Linkify => options.extension.autolink = true,
            MystExtension::Smartquotes => options.parse.smart = true,
            MystExtension::Strikethrough => options.extension.strikethrough = true,
            MystExtension::Tasklist => options.extension.tasklist = true,
            other => debug!("MyST extension '{other}' has no effect on the bundled engine"),
        }
    }
    options
}

/// Parse front-matter YAML into a JSON object. An empty block is an empty map.
fn parse_front_matter(yaml: &str) -> Result<Map<String, Value>, MystReaderError> {
    if yaml.trim().is_empty() {
        return Ok(Map::new());
    }
    let value: Value = serde_yaml::from_str(yaml)
        .map_err(|e| MystReaderError::ConversionFailed(format!("invalid front matter: {e}")))?;
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(MystReaderError::ConversionFailed(
            "front matter must be a mapping".into(),
        )),
    }
}

// ── Directives ───────────────────────────────────────────────────────────────

static RE_BIBLIOGRAPHY_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(`{3,})\{bibliography\}[ \t]*(.*?)\s*$").unwrap());

/// A code fence marker: `(character, run length, rest of line)`.
///
/// Up to three spaces of indent are allowed, as in CommonMark.
fn fence_marker(line: &str) -> Option<(char, usize, &str)> {
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        return None;
    }
    let ch = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = trimmed.chars().take_while(|c| *c == ch).count();
    (len >= 3).then(|| (ch, len, &trimmed[len..]))
}

/// Replace top-level `{bibliography}` directive fences with raw HTML
/// placeholder blocks. Directives shown inside another code fence are left
/// as they are.
fn render_directives(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut lines = body.split_inclusive('\n');
    let mut open_fence: Option<(char, usize)> = None;

    while let Some(line) = lines.next() {
        if let Some((ch, len)) = open_fence {
            if let Some((c, n, rest)) = fence_marker(line) {
                if c == ch && n >= len && rest.trim().is_empty() {
                    open_fence = None;
                }
            }
            out.push_str(line);
            continue;
        }

        let Some(caps) = RE_BIBLIOGRAPHY_FENCE.captures(line) else {
            if let Some((ch, len, _)) = fence_marker(line) {
                open_fence = Some((ch, len));
            }
            out.push_str(line);
            continue;
        };
        let fence = caps[1].to_string();
        let source = caps[2].to_string();

        // Skip the directive body up to and including the closing fence.
        for inner in lines.by_ref() {
            if inner.trim_end().starts_with(&fence) && inner.trim().chars().all(|c| c == '`') {
                break;
            }
        }

        out.push_str(&format!(
            "<div class=\"bibliography\" data-source=\"{}\"></div>\n",
            escape_html(&source)
        ));
    }
    out
}

// ── Headings and TOC ─────────────────────────────────────────────────────────

static RE_SLUG_STRIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\- ]").unwrap());

struct Heading {
    level: u8,
    id: String,
    text: String,
}

/// Give every heading a unique id and build the TOC from them.
///
/// Ids already present in the markup are reserved before any slug is
/// generated. Returns the re-serialised body and the `<nav>` (empty when
/// there are no headings).
fn anchor_headings(html: &str) -> Result<(String, String), MystReaderError> {
    // Opening the body first keeps leading <script>/<style>/<meta> out of <head>.
    let document = kuchikikiki::parse_html().one(format!("<body>{html}"));
    let Ok(body) = document.select_first("body") else {
        return Ok((html.to_string(), String::new()));
    };
    let body = body.as_node();

    let selected: Vec<_> = body
        .select("h1, h2, h3, h4, h5, h6")
        .map(|s| s.collect())
        .unwrap_or_default();

    let mut used: HashSet<String> = selected
        .iter()
        .filter_map(|h| h.attributes.borrow().get("id").map(str::to_string))
        .filter(|id| !id.is_empty())
        .collect();

    let mut headings = Vec::with_capacity(selected.len());
    for heading in &selected {
        let level = AsRef::<str>::as_ref(&heading.name.local)
            .trim_start_matches('h')
            .parse::<u8>()
            .unwrap_or(1);
        let text = heading.as_node().text_contents().trim().to_string();

        let mut attrs = heading.attributes.borrow_mut();
        let id = match attrs.get("id") {
            Some(existing) if !existing.is_empty() => existing.to_string(),
            _ => unique_slug(&text, &used),
        };
        attrs.insert("id", id.clone());
        used.insert(id.clone());
        headings.push(Heading { level, id, text });
    }

    let mut fragment = String::new();
    for child in body.children() {
        fragment.push_str(&serialize_node(&child)?);
    }
    Ok((fragment, build_toc(&headings)))
}

fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = RE_SLUG_STRIP.replace_all(&lowered, "");
    let slug = stripped.split_whitespace().collect::<Vec<_>>().join("-");
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}

fn unique_slug(text: &str, used: &HashSet<String>) -> String {
    let base = slugify(text);
    if !used.contains(&base) {
        return base;
    }
    (1..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or(base)
}

/// Render headings as nested lists inside `<nav id="TOC">`.
fn build_toc(headings: &[Heading]) -> String {
    if headings.is_empty() {
        return String::new();
    }

    let mut out = format!("<nav id=\"{TOC_ID}\" role=\"doc-toc\">\n");
    let mut open: Vec<u8> = Vec::new();
    for h in headings {
        while open.last().is_some_and(|&top| top > h.level) {
            out.push_str("</li>\n</ul>\n");
            open.pop();
        }
        match open.last() {
            Some(&top) if top == h.level => out.push_str("</li>\n"),
            Some(_) => {
                out.push_str("\n<ul>\n");
                open.push(h.level);
            }
            None => {
                out.push_str("<ul>\n");
                open.push(h.level);
            }
        }
        out.push_str(&format!(
            "<li><a href=\"#{}\">{}</a>",
            escape_html(&h.id),
            escape_html(&h.text)
        ));
    }
    for _ in open {
        out.push_str("</li>\n</ul>\n");
    }
    out.push_str("</nav>\n");
    out
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::postprocess::extract_contents;
    use serde_json::json;

    fn convert(text: &str) -> String {
        ComrakConverter
            .convert(text, &ParserConfig::default())
            .unwrap()
    }

    #[test]
    fn emits_json_line_then_body() {
        let out = convert("---\ntitle: Hello\ntags: [a, b]\n---\n\nSome *text*.\n");
        let (first, rest) = out.split_once('\n').unwrap();
        let meta: Value = serde_json::from_str(first).unwrap();
        assert_eq!(meta, json!({"title": "Hello", "tags": ["a", "b"]}));
        assert!(rest.starts_with("<body>"));
        assert!(rest.contains("<p>Some <em>text</em>.</p>"));
    }

    #[test]
    fn dates_stay_strings() {
        let out = convert("---\ndate: 2021-03-04\n---\nx\n");
        let meta: Value = serde_json::from_str(out.lines().next().unwrap()).unwrap();
        assert_eq!(meta["date"], json!("2021-03-04"));
    }

    #[test]
    fn empty_front_matter() {
        let out = convert("---\n---\nBody\n");
        assert!(out.starts_with("{}\n"));
    }

    #[test]
    fn rejects_bad_front_matter() {
        let err = ComrakConverter
            .convert("---\n- just\n- a list\n---\nx", &ParserConfig::default())
            .unwrap_err();
        assert!(matches!(err, MystReaderError::ConversionFailed(_)));
    }

    #[test]
    fn heading_ids_and_toc() {
        let out = convert("---\n---\n# Intro\n\n## Details\n\n## Details\n\n# Next Steps!\n");
        assert!(out.contains("<h1 id=\"intro\">Intro</h1>"));
        assert!(out.contains("<h2 id=\"details\">Details</h2>"));
        assert!(out.contains("<h2 id=\"details-1\">Details</h2>"));
        assert!(out.contains("<h1 id=\"next-steps\">"));
        assert!(out.contains("<nav id=\"TOC\" role=\"doc-toc\">"));
        assert!(out.contains("<a href=\"#details-1\">Details</a>"));
    }

    #[test]
    fn no_headings_no_toc() {
        let out = convert("---\n---\nJust a paragraph.\n");
        assert!(!out.contains("<nav"));
    }

    #[test]
    fn toc_nesting() {
        let headings = vec![
            Heading { level: 1, id: "a".into(), text: "A".into() },
            Heading { level: 2, id: "b".into(), text: "B".into() },
            Heading { level: 1, id: "c".into(), text: "C".into() },
        ];
        let toc = build_toc(&headings);
        assert_eq!(
            toc,
            "<nav id=\"TOC\" role=\"doc-toc\">\n<ul>\n<li><a href=\"#a\">A</a>\n<ul>\n\
             <li><a href=\"#b\">B</a></li>\n</ul>\n</li>\n<li><a href=\"#c\">C</a></li>\n</ul>\n</nav>\n"
        );
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("Hello, World"), "hello-world");
        assert_eq!(slugify("  snake_case  and-dash "), "snake_case-and-dash");
        assert_eq!(slugify("???"), "section");
    }

    #[test]
    fn bibliography_directive_rendered() {
        let out = convert("---\n---\nText\n\n```{bibliography} /site/paper.bib\n```\n\n");
        assert!(out.contains("<div class=\"bibliography\" data-source=\"/site/paper.bib\"></div>"));
        assert!(!out.contains("language-{bibliography}"));
    }

    #[test]
    fn other_fences_untouched() {
        let out = convert("---\n---\n```python\nprint(1)\n```\n");
        assert!(out.contains("<code class=\"language-python\">"));
    }

    #[test]
    fn directive_inside_other_fence_untouched() {
        let out = convert("---\n---\n````md\n```{bibliography} refs.bib\n```\n````\n");
        assert!(out.contains("<code class=\"language-md\">```{bibliography} refs.bib\n```\n</code>"));
        assert!(!out.contains("data-source"));

        let tilde = convert("---\n---\n~~~\n```{bibliography} refs.bib\n```\n~~~\n\nAfter\n");
        assert!(!tilde.contains("data-source"));
        assert!(tilde.contains("<p>After</p>"));
    }

    #[test]
    fn directive_after_closed_fence_rendered() {
        let out = convert("---\n---\n```text\nx\n```\n\n```{bibliography} refs.bib\n```\n");
        assert!(out.contains("<div class=\"bibliography\" data-source=\"refs.bib\"></div>"));
    }

    #[test]
    fn leading_script_and_style_kept() {
        let out = convert("---\n---\n<script>window.MathJax = {};</script>\n\n# Head\n\nText\n");
        assert!(out.contains("<script>window.MathJax = {};</script>"));
        assert!(out.contains("<h1 id=\"head\">Head</h1>"));

        let out = convert("---\n---\n<style>.x{color:red}</style>\n\nText\n");
        let extracted = extract_contents(&out, true).unwrap();
        assert!(extracted.html.contains("<style>.x{color:red}</style>"));
        assert!(extracted.html.contains("<p>Text</p>"));
    }

    #[test]
    fn explicit_ids_reserved() {
        let out = convert("---\n---\n# Intro\n\n<h2 id=\"intro\">Raw</h2>\n");
        assert!(out.contains("<h1 id=\"intro-1\">Intro</h1>"));
        assert!(out.contains("<h2 id=\"intro\">Raw</h2>"));
        assert!(out.contains("href=\"#intro-1\""));
    }

    #[test]
    fn static_links_percent_encoded() {
        let out = convert("---\n---\n![a]({static}images/a.png)\n");
        assert!(out.contains("%7Bstatic%7Dimages/a.png"));
    }

    #[test]
    fn extensions_change_rendering() {
        let md = "---\n---\n- [x] done\n\n~~gone~~\n";
        let plain = convert(md);
        assert!(!plain.contains("<del>"));

        let cfg = ParserConfig::from_extensions(&["tasklist", "strikethrough"]).unwrap();
        let rich = ComrakConverter.convert(md, &cfg).unwrap();
        assert!(rich.contains("<del>gone</del>"));
        assert!(rich.contains("checkbox"));
    }

    #[test]
    fn output_round_trips_through_extraction() {
        let out = convert("---\nTitle: Round\n---\n# Top\n\nBody\n");
        let extracted = extract_contents(&out, true).unwrap();
        assert!(extracted.toc.starts_with("<nav class=\"toc\""));
        assert!(extracted.html.starts_with("<h1 id=\"top\">Top</h1>"));
        assert_eq!(extracted.metadata["Title"], json!("Round"));
    }
}
