use horizon_core::format::{code_blocks, format_message};
use horizon_core::{
    ChatRole, ClipboardWriter, Config, Conversation, CopyId, CopyToken, CopyTracker, Generator,
    Provider,
};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub conversation: Conversation,
    pub copy_tracker: CopyTracker,
    clipboard: Box<dyn ClipboardWriter>,

    // Transcript view state
    pub selected_message: Option<usize>,
    pub chat_scroll: u16,
    pub follow_bottom: bool,
    pub chat_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Provider and model state
    pub config: Config,
    pub generator: Generator,
    pub show_provider_picker: bool,
    pub provider_picker_state: ListState,
    pub show_model_picker: bool,
    pub available_models: Vec<String>,
    pub model_picker_state: ListState,
    pub models_loading: bool,
}

impl App {
    pub fn new(config: Config, clipboard: Box<dyn ClipboardWriter>) -> Self {
        let generator = config.generator();
        info!(provider = generator.provider().as_str(), model = generator.model(), "session started");

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            conversation: Conversation::new(),
            copy_tracker: CopyTracker::new(),
            clipboard,

            selected_message: None,
            chat_scroll: 0,
            follow_bottom: true,
            chat_area: None,

            animation_frame: 0,

            config,
            generator,
            show_provider_picker: false,
            provider_picker_state: ListState::default(),
            show_model_picker: false,
            available_models: Vec::new(),
            model_picker_state: ListState::default(),
            models_loading: false,
        }
    }

    pub fn provider(&self) -> Provider {
        self.generator.provider()
    }

    /// Tick animation frame and drop an expired copy mark
    pub fn tick(&mut self) {
        if self.conversation.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.copy_tracker.sweep();
    }

    /// Send the input buffer. Returns the accepted prompt.
    pub fn submit(&mut self) -> Option<String> {
        let prompt = self.conversation.begin_from_input()?;
        self.follow_bottom = true;
        Some(prompt)
    }

    pub fn message_count(&self) -> usize {
        self.conversation.transcript().len()
    }

    // Message selection (for copy actions)
    pub fn select_next_message(&mut self) {
        let len = self.message_count();
        if len == 0 {
            return;
        }
        self.selected_message = Some(match self.selected_message {
            Some(i) => (i + 1).min(len - 1),
            None => len - 1,
        });
    }

    pub fn select_prev_message(&mut self) {
        let len = self.message_count();
        if len == 0 {
            return;
        }
        self.selected_message = Some(match self.selected_message {
            Some(i) => i.saturating_sub(1),
            None => len - 1,
        });
    }

    /// Message that copy actions apply to: the selection, else the latest reply
    pub fn copy_target(&self) -> Option<usize> {
        self.selected_message
            .filter(|&i| i < self.message_count())
            .or_else(|| self.conversation.last_assistant_index())
    }

    /// Copy a whole message. Returns the mark's token on success.
    pub fn copy_message(&mut self, index: usize) -> Option<CopyToken> {
        let content = self.conversation.transcript().get(index)?.content.clone();
        self.copy_tracker
            .copy(self.clipboard.as_mut(), CopyId::Message(index), &content)
    }

    /// Copy the `block`-th code block of an assistant message.
    pub fn copy_code_block(&mut self, index: usize, block: usize) -> Option<CopyToken> {
        let message = self.conversation.transcript().get(index)?;
        if message.role != ChatRole::Assistant {
            return None;
        }
        let nodes = format_message(&message.content);
        let code = code_blocks(&nodes).nth(block)?.1.to_string();
        self.copy_tracker.copy(
            self.clipboard.as_mut(),
            CopyId::CodeBlock {
                message: index,
                block,
            },
            &code,
        )
    }

    // Transcript scrolling
    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_bottom = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn chat_page(&self) -> u16 {
        self.chat_area
            .map(|r| r.height.saturating_sub(2) / 2)
            .unwrap_or(10)
            .max(1)
    }

    /// Clamp scroll to the rendered content and keep following the bottom
    /// while the user hasn't scrolled away.
    pub fn settle_scroll(&mut self, total_lines: u16, visible_height: u16) {
        let max_scroll = total_lines.saturating_sub(visible_height);
        if self.follow_bottom || self.chat_scroll >= max_scroll {
            self.chat_scroll = max_scroll;
            self.follow_bottom = true;
        }
    }

    // Provider picker
    pub fn open_provider_picker(&mut self) {
        let current = Provider::all()
            .iter()
            .position(|&p| p == self.provider())
            .unwrap_or(0);
        self.provider_picker_state.select(Some(current));
        self.show_provider_picker = true;
    }

    pub fn provider_picker_nav_down(&mut self) {
        let len = Provider::all().len();
        let i = self.provider_picker_state.selected().unwrap_or(0);
        self.provider_picker_state.select(Some((i + 1).min(len - 1)));
    }

    pub fn provider_picker_nav_up(&mut self) {
        let i = self.provider_picker_state.selected().unwrap_or(0);
        self.provider_picker_state.select(Some(i.saturating_sub(1)));
    }

    /// Switch provider, starting on its default model, and remember the choice.
    pub fn set_provider(&mut self, provider: Provider) {
        let model = provider.default_model().to_string();
        self.generator = Generator::new(self.config.backend(provider), model.clone());
        self.config.provider = Some(provider.as_str().to_string());
        self.config.default_model = Some(model);
        self.save_config();
    }

    // Model picker
    pub fn model_picker_nav_down(&mut self) {
        let len = self.available_models.len();
        if len > 0 {
            let i = self.model_picker_state.selected().unwrap_or(0);
            self.model_picker_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn model_picker_nav_up(&mut self) {
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn set_available_models(&mut self, models: Vec<String>) {
        let current = models
            .iter()
            .position(|m| m == self.generator.model())
            .unwrap_or(0);
        self.available_models = models;
        self.model_picker_state
            .select((!self.available_models.is_empty()).then_some(current));
        self.models_loading = false;
    }

    pub fn select_model(&mut self) {
        if let Some(model) = self
            .model_picker_state
            .selected()
            .and_then(|i| self.available_models.get(i))
            .cloned()
        {
            self.generator = Generator::new(self.config.backend(self.provider()), model.clone());
            self.config.default_model = Some(model);
            self.save_config();
        }
        self.show_model_picker = false;
    }

    fn save_config(&self) {
        if let Err(e) = self.config.save() {
            warn!(error = %e, "failed to save config");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_core::ClipboardError;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedClipboard(Arc<Mutex<Vec<String>>>);

    impl ClipboardWriter for SharedClipboard {
        fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn app_with_reply(reply: &str) -> (App, SharedClipboard) {
        let clipboard = SharedClipboard::default();
        let mut app = App::new(Config::new(), Box::new(clipboard.clone()));
        app.conversation.begin("show me");
        app.conversation.complete(Ok(reply.to_string()));
        (app, clipboard)
    }

    #[test]
    fn test_copy_code_block_by_ordinal() {
        let (mut app, clipboard) =
            app_with_reply("Two blocks:\n```sh\nls -la\n```\nand\n```py\nprint(1)\n```");

        assert!(app.copy_code_block(2, 1).is_some());
        assert_eq!(*clipboard.0.lock().unwrap(), vec!["print(1)\n".to_string()]);
        assert!(app.copy_tracker.is_copied(CopyId::CodeBlock { message: 2, block: 1 }));

        // Out of range block or a user message copies nothing
        assert!(app.copy_code_block(2, 5).is_none());
        assert!(app.copy_code_block(1, 0).is_none());
        assert_eq!(clipboard.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_copy_message_replaces_mark() {
        let (mut app, clipboard) = app_with_reply("```rs\nlet a = 1;\n```");
        app.copy_code_block(2, 0);
        app.copy_message(1);

        assert!(app.copy_tracker.is_copied(CopyId::Message(1)));
        assert!(!app.copy_tracker.is_copied(CopyId::CodeBlock { message: 2, block: 0 }));
        assert_eq!(clipboard.0.lock().unwrap().last().map(String::as_str), Some("show me"));
    }

    #[test]
    fn test_copy_target_defaults_to_latest_reply() {
        let (mut app, _) = app_with_reply("hi");
        assert_eq!(app.copy_target(), Some(2));
        app.select_prev_message();
        assert_eq!(app.copy_target(), Some(2));
        app.select_prev_message();
        assert_eq!(app.copy_target(), Some(1));
        app.select_next_message();
        app.select_next_message();
        assert_eq!(app.selected_message, Some(2));
    }

    #[test]
    fn test_settle_scroll_follows_bottom() {
        let (mut app, _) = app_with_reply("hi");
        app.settle_scroll(50, 20);
        assert_eq!(app.chat_scroll, 30);

        app.scroll_up(10);
        app.settle_scroll(60, 20);
        assert_eq!(app.chat_scroll, 20);
        assert!(!app.follow_bottom);

        app.scroll_down(100);
        app.settle_scroll(60, 20);
        assert_eq!(app.chat_scroll, 40);
        assert!(app.follow_bottom);
    }

    #[test]
    fn test_submit_is_gated_while_loading() {
        let (mut app, _) = app_with_reply("hi");
        for c in "next".chars() {
            app.conversation.input_mut().insert(c);
        }
        assert_eq!(app.submit(), Some("next".to_string()));
        for c in "again".chars() {
            app.conversation.input_mut().insert(c);
        }
        assert_eq!(app.submit(), None);
        assert_eq!(app.message_count(), 4);
    }
}
