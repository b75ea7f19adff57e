pub mod ai;
pub mod clipboard;
pub mod config;
pub mod conversation;
pub mod copy;
pub mod format;
pub mod provider;
pub mod state;

// Re-export main types for convenience
pub use ai::{
    Backend, ClaudeClient, GeminiClient, GenerationError, Generator, OllamaClient, OpenAIClient,
    TextGenerator,
};
pub use clipboard::{ClipboardError, ClipboardWriter, NoClipboard, SystemClipboard};
pub use config::Config;
pub use conversation::{Conversation, InputBuffer};
pub use copy::{CopyId, CopyToken, CopyTracker, COPY_FLASH};
pub use format::{format_message, DocumentNode, InlinePart, LineNode};
pub use provider::Provider;
pub use state::{ChatMessage, ChatRole};
