use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::warn;

use crate::generation::output_parser::BulletMarkers;

pub const DEFAULT_MODEL: &str = "google/flan-t5-small";
pub const DEFAULT_API_URL: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_MAX_NEW_TOKENS: u32 = 256;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Runtime configuration loaded from environment variables.
///
/// Every setting has a default. A malformed value is logged and replaced by its
/// default so configuration can never fail the process.
#[derive(Debug, Clone)]
pub struct Config {
    pub model: String,
    pub max_new_tokens: u32,
    pub api_url: String,
    pub api_token: Option<String>,
    pub timeout_secs: u64,
    pub bullet_markers: BulletMarkers,
}

impl Config {
    /// Reads the process environment. `main` loads `.env` before calling this.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let max_new_tokens = parse_or_default::<u32>(
            "LLM_MAX_NEW_TOKENS",
            non_empty("LLM_MAX_NEW_TOKENS"),
            DEFAULT_MAX_NEW_TOKENS,
        );
        let max_new_tokens = if max_new_tokens == 0 {
            warn!("LLM_MAX_NEW_TOKENS must be positive, using {DEFAULT_MAX_NEW_TOKENS}");
            DEFAULT_MAX_NEW_TOKENS
        } else {
            max_new_tokens
        };

        let timeout_secs = parse_or_default::<u64>(
            "LLM_TIMEOUT_SECS",
            non_empty("LLM_TIMEOUT_SECS"),
            DEFAULT_TIMEOUT_SECS,
        );
        let timeout_secs = if timeout_secs == 0 {
            warn!("LLM_TIMEOUT_SECS must be positive, using {DEFAULT_TIMEOUT_SECS}");
            DEFAULT_TIMEOUT_SECS
        } else {
            timeout_secs
        };

        Config {
            model: non_empty("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_new_tokens,
            api_url: non_empty("LLM_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_token: non_empty("HF_API_TOKEN"),
            timeout_secs,
            bullet_markers: non_empty("LLM_BULLET_MARKERS")
                .map(|glyphs| BulletMarkers::new(glyphs.chars()))
                .unwrap_or_default(),
        }
    }
}

fn parse_or_default<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let Some(raw) = raw else {
        return default;
    };

    match parse_setting::<T>(key, &raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("{e:#}, using default {default}");
            default
        }
    }
}

fn parse_setting<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("{key} must be a valid number, got '{raw}'"))
}
