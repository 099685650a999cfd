// Saved job searches: keyword groups plus the boolean query built from them.

pub mod builder;
pub mod handlers;
pub mod prompts;
