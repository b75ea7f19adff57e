//! Conversation state machine
//!
//! Owns the transcript and the loading gate. A conversation is either idle or
//! awaiting exactly one reply; submissions while awaiting are dropped, so
//! replies are always appended in the order their prompts were sent.

use tracing::{debug, info, warn};

use crate::ai::{GenerationError, TextGenerator};
use crate::state::{ChatMessage, ChatRole};

pub const GREETING: &str = "Hello! I'm your AI assistant. Ask me anything about programming, \
JavaScript, or any other topic you'd like help with.";

/// Prefix of the assistant turn recorded when generation fails.
pub const ERROR_PREFIX: &str = "Error: ";

/// Text being typed, with a cursor measured in chars.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputBuffer {
    text: String,
    cursor: usize,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl InputBuffer {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.text.chars().count() {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.chars().count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.text.chars().count();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }
}

#[derive(Debug, Clone)]
pub struct Conversation {
    transcript: Vec<ChatMessage>,
    loading: bool,
    input: InputBuffer,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// Start a session with the assistant greeting.
    pub fn new() -> Self {
        Self::with_greeting(GREETING)
    }

    pub fn with_greeting(greeting: &str) -> Self {
        Self {
            transcript: vec![ChatMessage::assistant(greeting)],
            loading: false,
            input: InputBuffer::default(),
        }
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn input(&self) -> &InputBuffer {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputBuffer {
        &mut self.input
    }

    /// Whether a submission would be accepted right now.
    pub fn can_submit(&self) -> bool {
        !self.loading && !self.input.is_blank()
    }

    /// Accept a prompt and move to awaiting.
    ///
    /// Returns the prompt to hand to the generator, or `None` when the prompt
    /// is blank or a reply is already pending. A rejected call changes nothing.
    pub fn begin(&mut self, prompt: &str) -> Option<String> {
        if self.loading {
            debug!("submission ignored: a reply is already pending");
            return None;
        }
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return None;
        }

        self.transcript.push(ChatMessage::user(prompt));
        self.input.clear();
        self.loading = true;
        Some(prompt.to_string())
    }

    /// Submit whatever is in the input buffer.
    pub fn begin_from_input(&mut self) -> Option<String> {
        let prompt = self.input.text().to_string();
        self.begin(&prompt)
    }

    /// Record the outcome of the pending request and return to idle.
    pub fn complete(&mut self, result: Result<String, GenerationError>) {
        if !self.loading {
            warn!("reply arrived with no request pending; dropped");
            return;
        }

        let content = match result {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "generation failed");
                format!("{ERROR_PREFIX}{e}")
            }
        };
        self.transcript.push(ChatMessage::assistant(content));
        self.loading = false;
    }

    /// Run a whole exchange against `generator`. Returns false when the
    /// prompt was not accepted.
    pub async fn submit<G>(&mut self, prompt: &str, generator: &G) -> bool
    where
        G: TextGenerator + ?Sized,
    {
        let Some(prompt) = self.begin(prompt) else {
            return false;
        };
        info!(chars = prompt.chars().count(), "sending prompt");
        let result = generator.generate(&prompt).await;
        self.complete(result);
        true
    }

    /// Index of the most recent assistant turn.
    pub fn last_assistant_index(&self) -> Option<usize> {
        self.transcript
            .iter()
            .rposition(|m| m.role == ChatRole::Assistant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo {
        calls: AtomicUsize,
    }

    impl Echo {
        fn new() -> Self {
            Self { calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl TextGenerator for Echo {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("echo: {prompt}"))
        }
    }

    struct Failing;

    #[async_trait]
    impl TextGenerator for Failing {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            Err(GenerationError::Api {
                provider: "Gemini",
                status: 429,
                body: "quota exhausted".to_string(),
            })
        }
    }

    #[test]
    fn test_starts_with_greeting() {
        let conversation = Conversation::new();
        assert_eq!(conversation.transcript(), &[ChatMessage::assistant(GREETING)]);
        assert!(!conversation.is_loading());
    }

    #[tokio::test]
    async fn test_successful_exchange() {
        let mut conversation = Conversation::new();
        let echo = Echo::new();

        assert!(conversation.submit("  what is a trait?  ", &echo).await);

        let transcript = conversation.transcript();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[1], ChatMessage::user("what is a trait?"));
        assert_eq!(transcript[2], ChatMessage::assistant("echo: what is a trait?"));
        assert!(!conversation.is_loading());
        assert_eq!(echo.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_becomes_error_turn() {
        let mut conversation = Conversation::new();

        assert!(conversation.submit("hello", &Failing).await);

        let transcript = conversation.transcript();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[2].role, ChatRole::Assistant);
        assert_eq!(transcript[2].content, "Error: Gemini API error 429: quota exhausted");
        assert!(!conversation.is_loading());

        // Ready for another try
        assert!(conversation.submit("again", &Echo::new()).await);
        assert_eq!(conversation.transcript().len(), 5);
    }

    #[tokio::test]
    async fn test_blank_prompts_are_ignored() {
        let mut conversation = Conversation::new();
        let echo = Echo::new();

        assert!(!conversation.submit("", &echo).await);
        assert!(!conversation.submit("   \n\t", &echo).await);

        assert_eq!(conversation.transcript().len(), 1);
        assert!(!conversation.is_loading());
        assert_eq!(echo.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_begin_while_awaiting_is_ignored() {
        let mut conversation = Conversation::new();
        assert_eq!(conversation.begin("first"), Some("first".to_string()));
        assert!(conversation.is_loading());

        conversation.input_mut().insert('x');
        assert_eq!(conversation.begin("second"), None);
        assert_eq!(conversation.begin_from_input(), None);
        assert_eq!(conversation.transcript().len(), 2);
        // Input typed while waiting is kept
        assert_eq!(conversation.input().text(), "x");

        conversation.complete(Ok("reply".to_string()));
        assert_eq!(conversation.transcript().len(), 3);
        assert!(!conversation.is_loading());
    }

    #[test]
    fn test_begin_from_input_clears_buffer() {
        let mut conversation = Conversation::new();
        for c in "hi there".chars() {
            conversation.input_mut().insert(c);
        }
        assert!(conversation.can_submit());

        assert_eq!(conversation.begin_from_input(), Some("hi there".to_string()));
        assert_eq!(conversation.input().text(), "");
        assert_eq!(conversation.input().cursor(), 0);
        assert!(!conversation.can_submit());
    }

    #[test]
    fn test_stray_completion_is_dropped() {
        let mut conversation = Conversation::new();
        conversation.complete(Ok("unsolicited".to_string()));
        assert_eq!(conversation.transcript().len(), 1);
    }

    #[test]
    fn test_replies_follow_submission_order() {
        let mut conversation = Conversation::new();
        for (i, prompt) in ["one", "two", "three"].iter().enumerate() {
            conversation.begin(prompt);
            conversation.complete(Ok(format!("reply {i}")));
        }
        let contents: Vec<_> = conversation.transcript()[1..]
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, ["one", "reply 0", "two", "reply 1", "three", "reply 2"]);
        assert_eq!(conversation.last_assistant_index(), Some(6));
    }

    #[test]
    fn test_input_editing_is_char_safe() {
        let mut input = InputBuffer::default();
        for c in "héllo".chars() {
            input.insert(c);
        }
        input.move_left();
        input.move_left();
        input.backspace();
        assert_eq!(input.text(), "hélo");
        input.home();
        input.delete();
        assert_eq!(input.text(), "élo");
        input.end();
        input.insert('!');
        assert_eq!(input.text(), "élo!");
        input.move_right();
        assert_eq!(input.cursor(), 4);
    }
}
