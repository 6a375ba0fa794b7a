// Generation: the intent-routing graph and its HTTP entry point.
// All completion calls go through llm_client::CompletionModel.

pub mod graph;
pub mod handlers;
pub mod prompts;
