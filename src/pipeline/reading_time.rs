//! Reading-time estimate from a Markdown word count.
//!
//! Words are counted from the text `pulldown-cmark` reports, so link targets,
//! emphasis markers, HTML tags and the front-matter block never count as
//! words.

use crate::error::MystReaderError;
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use serde_json::Value;

/// Count the words a reader would actually read in `markdown`.
pub fn count_words_in_markdown(markdown: &str) -> usize {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS);

    let mut text = String::with_capacity(markdown.len());
    let mut in_metadata = false;
    for event in Parser::new_ext(markdown, options) {
        match event {
            Event::Start(Tag::MetadataBlock(_)) => in_metadata = true,
            Event::End(TagEnd::MetadataBlock(_)) => in_metadata = false,
            Event::Text(t) | Event::Code(t) if !in_metadata => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            Event::End(end) if !is_inline(&end) => text.push(' '),
            _ => {}
        }
    }
    text.split_whitespace().count()
}

fn is_inline(end: &TagEnd) -> bool {
    matches!(
        end,
        TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link | TagEnd::Image
    )
}

/// Coerce a host `READING_SPEED` value to words per minute.
///
/// Numbers and numeric strings are accepted; the result must be positive and
/// finite.
pub fn parse_reading_speed(value: &Value) -> Result<f64, MystReaderError> {
    let speed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match speed {
        Some(s) if s.is_finite() && s > 0.0 => Ok(s),
        _ => Err(MystReaderError::ReadingSpeedConfiguration {
            value: value.to_string(),
        }),
    }
}

/// Format a whole number of minutes.
pub fn format_minutes(minutes: u64) -> String {
    if minutes == 1 {
        "1 minute".to_string()
    } else {
        format!("{minutes} minutes")
    }
}

/// Estimate how long `markdown` takes to read at `reading_speed` words/minute.
pub fn estimate_reading_time(
    markdown: &str,
    reading_speed: &Value,
) -> Result<String, MystReaderError> {
    let speed = parse_reading_speed(reading_speed)?;
    let words = count_words_in_markdown(markdown);
    let minutes = (words as f64 / speed).ceil() as u64;
    Ok(format_minutes(minutes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[test]
    fn four_hundred_words() {
        assert_eq!(
            estimate_reading_time(&words(400), &json!(200)).unwrap(),
            "2 minutes"
        );
    }

    #[test]
    fn exactly_one_minute() {
        assert_eq!(
            estimate_reading_time(&words(200), &json!(200)).unwrap(),
            "1 minute"
        );
    }

    #[test]
    fn rounds_up() {
        assert_eq!(
            estimate_reading_time(&words(201), &json!(200)).unwrap(),
            "2 minutes"
        );
    }

    #[test]
    fn empty_is_zero_minutes() {
        assert_eq!(estimate_reading_time("", &json!(200)).unwrap(), "0 minutes");
    }

    #[test]
    fn numeric_string_speed() {
        assert_eq!(
            estimate_reading_time(&words(300), &json!("150")).unwrap(),
            "2 minutes"
        );
        assert_eq!(
            estimate_reading_time(&words(100), &json!(50.0)).unwrap(),
            "2 minutes"
        );
    }

    #[test]
    fn non_numeric_speed() {
        for bad in [json!("fast"), json!(null), json!([200]), json!(0), json!(-5)] {
            let err = estimate_reading_time("a b c", &bad).unwrap_err();
            assert_eq!(err.to_string(), "READING_SPEED setting must be a number.");
        }
    }

    #[test]
    fn markup_not_counted() {
        let md = "# Title\n\nSome **bold** and [a link](https://example.com/x) `code`.\n";
        assert_eq!(count_words_in_markdown(md), 7);
    }

    #[test]
    fn front_matter_not_counted() {
        let md = "---\ntitle: Many words in this title\ntags: a, b, c\n---\n\nOne two three.\n";
        assert_eq!(count_words_in_markdown(md), 3);
    }

    #[test]
    fn inline_markup_does_not_split_words() {
        assert_eq!(count_words_in_markdown("un**believ**able words"), 2);
    }

    #[test]
    fn blocks_do_not_merge_words() {
        assert_eq!(count_words_in_markdown("# end\nstart"), 2);
        assert_eq!(count_words_in_markdown("- one\n- two\n"), 2);
    }
}
