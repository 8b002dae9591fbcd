//! Summary Generation — orchestrates the full one-shot pipeline.
//!
//! Flow: normalize request → build prompt → generate → parse output → respond.
//!
//! Every failure after normalization converges on `SummaryResponse::empty()`.
//! Callers treat empty fields as "generation unavailable" and fall back on
//! their own content.

use tracing::info;

use crate::config::Config;
use crate::errors::AppError;
use crate::generation::output_parser::parse_generated_text;
use crate::generation::prompts::build_summary_prompt;
use crate::llm_client::TextGenerator;
use crate::models::summary::{SummaryRequest, SummaryResponse};

/// Runs the pipeline on raw stdin contents. Never fails.
pub async fn respond(raw: &str, llm: &dyn TextGenerator, config: &Config) -> SummaryResponse {
    let request = SummaryRequest::from_raw(raw);
    generate_summary(llm, &request, config).await
}

/// Generates a summary for a normalized request.
///
/// This is the single guarded region: generation and both parse tiers run
/// inside it, and any error yields the canonical empty response.
pub async fn generate_summary(
    llm: &dyn TextGenerator,
    request: &SummaryRequest,
    config: &Config,
) -> SummaryResponse {
    match try_generate_summary(llm, request, config).await {
        Ok(response) => response,
        Err(e) => {
            e.log();
            SummaryResponse::empty()
        }
    }
}

async fn try_generate_summary(
    llm: &dyn TextGenerator,
    request: &SummaryRequest,
    config: &Config,
) -> Result<SummaryResponse, AppError> {
    let prompt = build_summary_prompt(request);
    info!(
        "Generating summary: domain={}, present={}, recommended={}, strengths={}, prompt_chars={}",
        request.domain(),
        request.present.len(),
        request.missing.len(),
        request.top_good.len(),
        prompt.chars().count()
    );

    let generated = llm.generate(&prompt, config.max_new_tokens).await?;
    let response = parse_generated_text(&generated, &config.bullet_markers);

    info!(
        "Generated summary with {} bullets (summary empty: {})",
        response.bullets.len(),
        response.summary.is_empty()
    );
    Ok(response)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
