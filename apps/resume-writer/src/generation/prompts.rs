//! Prompt construction for summary generation.
//!
//! The prompt is the only channel into the model, so everything it needs
//! (domain, skill signals, resume text) is rendered here.

use crate::llm_client::prompts::{JSON_CUE, JSON_OUTPUT_INSTRUCTION};
use crate::models::summary::SummaryRequest;

/// Hard cap on resume characters placed in the prompt. May cut mid-word.
pub const MAX_RESUME_CHARS: usize = 6000;

/// Task description that follows the domain line.
pub const SUMMARY_TASK_INSTRUCTION: &str = "Given the raw resume text, produce a concise \
    professional summary (1-2 sentences) and 4-6 bullet points that are clear, action-driven, \
    and use metrics when plausible. Prefer the following recommended or present skills if relevant.";

/// Renders the generation prompt for a request. Deterministic.
pub fn build_summary_prompt(request: &SummaryRequest) -> String {
    format!(
        "You are a resume assistant. Domain: {domain}. {task} {output}\n\n\
         Present skills: {present}\n\
         Recommended skills: {missing}\n\
         Strength terms: {top_good}\n\n\
         Resume text:\n{text}\n\n\
         {cue}",
        domain = request.domain(),
        task = SUMMARY_TASK_INSTRUCTION,
        output = JSON_OUTPUT_INSTRUCTION,
        present = request.present.join(", "),
        missing = request.missing.join(", "),
        top_good = request.top_good.join(", "),
        text = truncate_chars(&request.text, MAX_RESUME_CHARS),
        cue = JSON_CUE,
    )
}

/// Returns the first `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
