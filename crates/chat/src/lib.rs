pub mod llm;
pub mod message;
pub mod retry;
pub mod session;
pub mod template;

pub use llm::{ChatCompletion, DEFAULT_BASE_URL, DEFAULT_MODEL, OllamaChatClient};
pub use message::{ChatMessage, ConversationLog, Role};
pub use retry::{RetryConfig, RetryPolicy};
pub use session::ChatSession;
pub use template::ChatTemplate;
