// Career exploration core: catalog-driven stage state machine.
// All LLM calls go through llm_client; no direct Anthropic calls here.

pub mod catalog;
pub mod engine;
pub mod handlers;
pub mod prompts;
pub mod providers;
pub mod session;
pub mod validator;
