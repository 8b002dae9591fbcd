use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_DOMAIN: &str = "generic";

/// Request payload read from stdin.
///
/// Every field is lenient: missing, `null`, or wrong-typed values resolve to
/// their empty default instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SummaryRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub missing: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub present: Vec<String>,
    #[serde(default, rename = "topGood", deserialize_with = "lenient_list")]
    pub top_good: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub domain: String,
}

impl SummaryRequest {
    /// Parses raw stdin contents. Blank or unparseable input yields the default
    /// request; so does any JSON value that is not an object.
    pub fn from_raw(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }

        match serde_json::from_str::<Value>(raw) {
            Ok(value @ Value::Object(_)) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::warn!("Request fields could not be read, using defaults: {e}");
                Self::default()
            }),
            Ok(other) => {
                tracing::warn!("Request is not a JSON object ({}), using defaults", kind(&other));
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Request is not valid JSON, using defaults: {e}");
                Self::default()
            }
        }
    }

    /// The target domain, `"generic"` when none was given.
    pub fn domain(&self) -> &str {
        if self.domain.is_empty() {
            DEFAULT_DOMAIN
        } else {
            &self.domain
        }
    }
}

/// The only shape ever written to stdout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
    pub bullets: Vec<String>,
}

impl SummaryResponse {
    /// The canonical empty response emitted on any generation failure.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && self.bullets.is_empty()
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().filter_map(render_item).collect(),
        _ => Vec::new(),
    })
}

/// Renders one list element as display text. Nulls are dropped.
fn render_item(item: Value) -> Option<String> {
    match item {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
