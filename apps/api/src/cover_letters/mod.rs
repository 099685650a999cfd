// Cover letters: CRUD over four fixed sections, LLM section writing with
// `{{placeholder}}` markers, and rendering against a job description.

pub mod handlers;
pub mod placeholders;
pub mod prompts;
pub mod validation;
