//! AI module: the generation capability, its HTTP implementation and the
//! prompt library.

pub mod anthropic;
pub mod processor;
pub mod prompts;

pub use anthropic::AnthropicProcessor;
pub use processor::{AiError, ContentProcessor, ProcessRequest};
pub use prompts::PromptSource;
