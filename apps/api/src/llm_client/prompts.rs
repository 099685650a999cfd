// Shared prompt constants and prompt-building utilities.
// Each feature that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

use serde_json::Value;

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// System prompt for free-text writing tasks.
pub const PLAIN_TEXT_SYSTEM: &str = "You are an expert career writer. \
    Return ONLY the requested text. \
    Never add comments, explanations, notes or headings of your own.";

/// Pretty-prints candidate data for inclusion in a prompt.
pub fn candidate_json(data: &Value) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string())
}
