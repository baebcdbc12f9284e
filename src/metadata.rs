//! Metadata normalisation and the host metadata hook.
//!
//! The converter reports front-matter fields verbatim. Before they reach the
//! host every key is lower-cased, string values lose surrounding whitespace
//! and double quotes, and each pair is handed to a [`MetadataProcessor`] so
//! the host can coerce values its own way (dates, tag lists, authors).

use serde_json::{Map, Value};

/// Metadata mapping returned for each document.
pub type Metadata = Map<String, Value>;

/// Per-key value transformation supplied by the host.
///
/// Any `Fn(&str, Value) -> Value + Send + Sync` closure implements this trait.
pub trait MetadataProcessor: Send + Sync {
    fn process(&self, key: &str, value: Value) -> Value;
}

impl<F> MetadataProcessor for F
where
    F: Fn(&str, Value) -> Value + Send + Sync,
{
    fn process(&self, key: &str, value: Value) -> Value {
        self(key, value)
    }
}

/// Returns every value unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityProcessor;

impl MetadataProcessor for IdentityProcessor {
    fn process(&self, _key: &str, value: Value) -> Value {
        value
    }
}

/// Splits comma-separated string values of list-like keys into arrays,
/// the way Pelican treats `tags` and `authors`.
#[derive(Debug, Clone)]
pub struct ListSplitProcessor {
    keys: Vec<String>,
}

impl Default for ListSplitProcessor {
    fn default() -> Self {
        Self {
            keys: vec!["tags".into(), "authors".into()],
        }
    }
}

impl ListSplitProcessor {
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl MetadataProcessor for ListSplitProcessor {
    fn process(&self, key: &str, value: Value) -> Value {
        if !self.keys.iter().any(|k| k == key) {
            return value;
        }
        match value {
            Value::String(s) => Value::Array(
                s.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(|item| Value::String(item.to_string()))
                    .collect(),
            ),
            other => other,
        }
    }
}

/// Lower-case keys, clean string values, and run every pair through `processor`.
///
/// Keys that collide after lower-casing keep the value of the last one in
/// map order.
pub fn normalize_metadata(raw: Map<String, Value>, processor: &dyn MetadataProcessor) -> Metadata {
    let mut metadata = Metadata::new();
    for (key, value) in raw {
        let key = key.to_lowercase();
        let value = match value {
            Value::String(s) if !s.is_empty() => Value::String(clean_string(&s).to_string()),
            other => other,
        };
        let value = processor.process(&key, value);
        metadata.insert(key, value);
    }
    metadata
}

fn clean_string(s: &str) -> &str {
    s.trim().trim_matches('"')
}
