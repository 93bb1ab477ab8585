//! YAML frontmatter extraction and loosely-typed field access.
//!
//! Frontmatter is kept as an insertion-ordered `serde_yaml::Mapping` so that
//! fields this crate never reads survive a load/save cycle untouched. Every
//! read of a list-typed field goes through [`coerce_list`], which turns a bare
//! scalar into a one-element list.

use crate::io;
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_yaml::{Mapping, Value};
use std::path::Path;
use std::sync::OnceLock;

static FRONTMATTER_RE: OnceLock<Regex> = OnceLock::new();

fn frontmatter_re() -> &'static Regex {
    FRONTMATTER_RE.get_or_init(|| {
        Regex::new(r"\A---[ \t]*\r?\n((?s:.*?)\r?\n)---[ \t]*(?:\r?\n|\z)").unwrap()
    })
}

const READINESS_HEADING: &str = "## Next Phase Readiness";

// ---------------------------------------------------------------------------
// Frontmatter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter(Mapping);

impl Frontmatter {
    pub fn new(map: Mapping) -> Self {
        Self(map)
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.0
    }

    pub fn into_mapping(self) -> Mapping {
        self.0
    }

    /// Field value; an explicit `null` reads the same as an absent key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Scalar field rendered as text, or `""` when absent or not a scalar.
    pub fn text(&self, key: &str) -> String {
        self.get(key).and_then(scalar_text).unwrap_or_default()
    }

    /// Any field rendered as text: scalars as-is, lists and maps as compact
    /// JSON, `""` when absent.
    pub fn rendered(&self, key: &str) -> String {
        self.get(key).map(value_text).unwrap_or_default()
    }

    /// List-typed field with scalar-to-singleton coercion.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.get(key).map(coerce_list).unwrap_or_default()
    }

    /// Raw items of a list-typed field with scalar-to-singleton coercion.
    pub fn items(&self, key: &str) -> Vec<&Value> {
        self.get(key).map(coerce_items).unwrap_or_default()
    }

    /// List-typed field nested one level down (`tech-stack.added`). Yields
    /// nothing when the parent is absent or is not a mapping.
    pub fn nested_list(&self, key: &str, child: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::Mapping(m)) => m.get(child).map(coerce_list).unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        yaml_to_json(&Value::Mapping(self.0.clone()))
    }
}

impl Serialize for Frontmatter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

/// The items of a list-typed value. `null` and `""` are empty, a sequence is
/// itself, and any other single value becomes a one-element list.
pub fn coerce_items(value: &Value) -> Vec<&Value> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) if s.is_empty() => Vec::new(),
        Value::Sequence(items) => items.iter().collect(),
        Value::Tagged(tagged) => coerce_items(&tagged.value),
        other => vec![other],
    }
}

/// [`coerce_items`] rendered as strings.
pub fn coerce_list(value: &Value) -> Vec<String> {
    coerce_items(value).into_iter().map(value_text).collect()
}

/// Text of a scalar (`string`, number, bool); `None` for null and collections.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Text of any value; collections are rendered as compact JSON.
pub fn value_text(value: &Value) -> String {
    scalar_text(value).unwrap_or_else(|| match value {
        Value::Null => String::new(),
        other => yaml_to_json(other).to_string(),
    })
}

/// Convert YAML to JSON. Non-string mapping keys are stringified.
pub fn yaml_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                serde_json::Value::from(i)
            } else if let Some(u) = n.as_u64() {
                serde_json::Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null)
            }
        }
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Sequence(items) => {
            serde_json::Value::Array(items.iter().map(yaml_to_json).collect())
        }
        Value::Mapping(map) => {
            let obj = map
                .iter()
                .map(|(k, v)| (value_text(k), yaml_to_json(v)))
                .collect();
            serde_json::Value::Object(obj)
        }
        Value::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Split `text` into the raw YAML between the `---` delimiters and the body
/// after the closing delimiter.
pub fn split_frontmatter(text: &str) -> Option<(&str, &str)> {
    let caps = frontmatter_re().captures(text)?;
    let yaml = caps.get(1)?.as_str();
    let end = caps.get(0)?.end();
    Some((yaml, &text[end..]))
}

/// Parse the leading frontmatter block of `text`.
///
/// Returns `None` when there is no block, the YAML is invalid, or the YAML is
/// not a mapping. An empty block parses to an empty mapping.
pub fn parse_frontmatter(text: &str) -> Option<Frontmatter> {
    let (yaml, _) = split_frontmatter(text)?;
    match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Mapping(map)) => Some(Frontmatter(map)),
        Ok(Value::Null) => Some(Frontmatter::default()),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(error = %e, "invalid frontmatter yaml");
            None
        }
    }
}

/// Load a file's frontmatter. Unreadable files read as "absent".
pub fn load_frontmatter(path: &Path) -> Option<Frontmatter> {
    let text = io::read_lossy(path).ok()?;
    parse_frontmatter(&text)
}

/// True when `text` has a `## Next Phase Readiness` section with real content.
pub fn has_readiness_section(text: &str) -> bool {
    let Some(idx) = text.find(READINESS_HEADING) else {
        return false;
    };
    let after = &text[idx + READINESS_HEADING.len()..];
    let section = match after.find("\n## ") {
        Some(end) => &after[..end],
        None => after,
    };
    !section.trim().trim_matches('-').trim().is_empty()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
