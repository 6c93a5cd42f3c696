//! Answers questions about a user's finances with an external completion API.

mod ask;
mod ask_endpoint;
mod assistant_page;
pub(crate) mod client;
mod prompt;

pub use ask_endpoint::ask_endpoint;
pub use assistant_page::get_assistant_page;
pub use client::{CompletionService, OpenAiClient};
