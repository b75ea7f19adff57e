use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use horizon_core::{CopyToken, Provider, TextGenerator};
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::app::{App, InputMode};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent, tx: &UnboundedSender<AppEvent>) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key, tx),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick(),
        AppEvent::Reply(result) => {
            if let Ok(reply) = &result {
                info!(chars = reply.chars().count(), "reply received");
            }
            app.conversation.complete(result);
            app.follow_bottom = true;
        }
        AppEvent::CopyExpired(token) => {
            app.copy_tracker.expire(token);
        }
        AppEvent::Models(result) => match result {
            Ok(models) => app.set_available_models(models),
            Err(e) => {
                warn!(error = %e, "could not list models");
                app.set_available_models(Vec::new());
            }
        },
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent, tx: &UnboundedSender<AppEvent>) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.show_provider_picker {
        handle_provider_picker(app, key, tx);
        return;
    }
    if app.show_model_picker {
        handle_model_picker(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key, tx),
        InputMode::Editing => handle_editing_mode(app, key, tx),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent, tx: &UnboundedSender<AppEvent>) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('i') | KeyCode::Enter => app.input_mode = InputMode::Editing,

        // Message selection
        KeyCode::Char('j') | KeyCode::Down => app.select_next_message(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev_message(),
        KeyCode::Esc => app.selected_message = None,

        // Copy
        KeyCode::Char('y') => {
            if let Some(index) = app.copy_target() {
                let token = app.copy_message(index);
                schedule_copy_expiry(app, token, tx);
            }
        }
        KeyCode::Char(c @ '1'..='9') => {
            if let Some(index) = app.copy_target() {
                let block = c as usize - '1' as usize;
                let token = app.copy_code_block(index, block);
                schedule_copy_expiry(app, token, tx);
            }
        }

        // Scrolling
        KeyCode::PageDown | KeyCode::Char('d') => {
            let page = app.chat_page();
            app.scroll_down(page);
        }
        KeyCode::PageUp | KeyCode::Char('u') => {
            let page = app.chat_page();
            app.scroll_up(page);
        }
        KeyCode::Char('G') | KeyCode::End => app.follow_bottom = true,

        // Provider and model
        KeyCode::Char('p') => app.open_provider_picker(),
        KeyCode::Char('m') => open_model_picker(app, tx),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent, tx: &UnboundedSender<AppEvent>) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            return;
        }
        KeyCode::Enter => {
            if let Some(prompt) = app.submit() {
                spawn_generation(app, prompt, tx);
            }
            return;
        }
        _ => {}
    }

    let input = app.conversation.input_mut();
    match key.code {
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.move_left(),
        KeyCode::Right => input.move_right(),
        KeyCode::Home => input.home(),
        KeyCode::End => input.end(),
        KeyCode::Char(c) => input.insert(c),
        _ => {}
    }
}

/// Run the request in the background; the reply comes back as an event.
fn spawn_generation(app: &App, prompt: String, tx: &UnboundedSender<AppEvent>) {
    let generator = app.generator.clone();
    let tx = tx.clone();
    info!(
        provider = generator.provider().as_str(),
        model = generator.model(),
        "sending prompt"
    );
    tokio::spawn(async move {
        let result = generator.generate(&prompt).await;
        if tx.send(AppEvent::Reply(result)).is_err() {
            debug!("event loop closed before reply arrived");
        }
    });
}

/// Clear the mark once its flash is over, unless a newer copy replaced it.
fn schedule_copy_expiry(app: &App, token: Option<CopyToken>, tx: &UnboundedSender<AppEvent>) {
    let Some(token) = token else { return };
    let flash = app.copy_tracker.flash();
    let tx = tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(flash).await;
        let _ = tx.send(AppEvent::CopyExpired(token));
    });
}

fn handle_provider_picker(app: &mut App, key: KeyEvent, tx: &UnboundedSender<AppEvent>) {
    match key.code {
        KeyCode::Esc => app.show_provider_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.provider_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.provider_picker_nav_up(),
        KeyCode::Enter => {
            let providers = Provider::all();
            if let Some(&provider) = app
                .provider_picker_state
                .selected()
                .and_then(|i| providers.get(i))
            {
                app.set_provider(provider);
                app.show_provider_picker = false;
                // Ollama models vary per machine, so let the user pick one
                if provider == Provider::Ollama {
                    open_model_picker(app, tx);
                }
            }
        }
        _ => {}
    }
}

fn handle_model_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.show_model_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.model_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.model_picker_nav_up(),
        KeyCode::Enter => app.select_model(),
        _ => {}
    }
}

fn open_model_picker(app: &mut App, tx: &UnboundedSender<AppEvent>) {
    app.show_model_picker = true;
    let provider = app.provider();
    if provider != Provider::Ollama {
        app.set_available_models(provider.static_models());
        return;
    }

    app.available_models.clear();
    app.models_loading = true;
    let client = horizon_core::OllamaClient::new(app.config.ollama_url());
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = client.list_models().await;
        let _ = tx.send(AppEvent::Models(result));
    });
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .is_some_and(|r| point_in_rect(mouse.column, mouse.row, r));
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}
