// Resume files: upload, text extraction, LLM parsing and scoring.
// All LLM calls go through llm_client.

pub mod analysis;
pub mod handlers;
pub mod processing;
pub mod prompts;
