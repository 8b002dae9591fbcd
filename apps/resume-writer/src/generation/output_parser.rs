//! Output normalization — turns raw model text into a `SummaryResponse`.
//!
//! Two tiers, tried in order with no backtracking:
//! 1. Structured: the text is a JSON object with `summary` / `bullets`.
//! 2. Heuristic: first non-empty line is the summary, the next six are bullets.
//!
//! Both tiers feed the same final shaping (trim, drop empties, cap at 8).

use serde_json::Value;
use tracing::debug;

use crate::llm_client::strip_json_fences;
use crate::models::summary::SummaryResponse;

/// Maximum bullets in any response.
pub const MAX_BULLETS: usize = 8;
/// Bullet candidates taken by the heuristic tier after the summary line.
pub const MAX_HEURISTIC_BULLETS: usize = 6;

const DEFAULT_MARKERS: &[char] = &['-', '•', '*', '·', '–', '—'];

/// Glyphs stripped from the start of heuristic-tier lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulletMarkers(Vec<char>);

impl Default for BulletMarkers {
    fn default() -> Self {
        Self(DEFAULT_MARKERS.to_vec())
    }
}

impl BulletMarkers {
    pub fn new(glyphs: impl IntoIterator<Item = char>) -> Self {
        let mut markers: Vec<char> = Vec::new();
        for glyph in glyphs {
            if !glyph.is_whitespace() && !markers.contains(&glyph) {
                markers.push(glyph);
            }
        }
        Self(markers)
    }

    pub fn contains(&self, glyph: char) -> bool {
        self.0.contains(&glyph)
    }

    /// Strips leading markers (interleaved with whitespace) and trailing whitespace.
    pub fn strip<'a>(&self, line: &'a str) -> &'a str {
        line.trim_start_matches(|c: char| c.is_whitespace() || self.contains(c))
            .trim_end()
    }
}

/// Which tier produced the candidates. Logged for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseTier {
    Structured,
    Heuristic,
}

/// Normalizes raw generated text into the fixed response shape.
pub fn parse_generated_text(generated: &str, markers: &BulletMarkers) -> SummaryResponse {
    let (tier, summary, bullets) = match parse_structured(generated) {
        Some((summary, bullets)) => (ParseTier::Structured, summary, bullets),
        None => {
            let (summary, bullets) = parse_heuristic(generated, markers);
            (ParseTier::Heuristic, summary, bullets)
        }
    };

    let response = shape(summary, bullets);
    debug!(
        "Parsed generation via {:?} tier: summary_chars={}, bullets={}",
        tier,
        response.summary.chars().count(),
        response.bullets.len()
    );
    response
}

/// Structured tier. `None` means fall through to the heuristic tier.
///
/// Accepts an object whose `summary` is a string or absent. Non-list `bullets`
/// becomes empty; non-string bullet entries are dropped.
fn parse_structured(generated: &str) -> Option<(String, Vec<String>)> {
    let value: Value = serde_json::from_str(strip_json_fences(generated)).ok()?;
    let object = value.as_object()?;

    let summary = match object.get("summary") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(_) => return None,
    };

    let bullets = match object.get("bullets") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    Some((summary, bullets))
}

fn parse_heuristic(generated: &str, markers: &BulletMarkers) -> (String, Vec<String>) {
    let mut lines = generated
        .lines()
        .map(|line| markers.strip(line))
        .filter(|line| !line.is_empty());

    let summary = lines.next().unwrap_or_default().to_string();
    let bullets = lines
        .take(MAX_HEURISTIC_BULLETS)
        .map(str::to_string)
        .collect();

    (summary, bullets)
}

fn shape(summary: String, bullets: Vec<String>) -> SummaryResponse {
    SummaryResponse {
        summary: summary.trim().to_string(),
        bullets: bullets
            .iter()
            .map(|b| b.trim())
            .filter(|b| !b.is_empty())
            .take(MAX_BULLETS)
            .map(str::to_string)
            .collect(),
    }
}
