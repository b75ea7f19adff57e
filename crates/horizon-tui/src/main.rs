mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use anyhow::Result;
use horizon_core::{clipboard, Config};
use tracing::{info, warn};

use crate::app::App;
use crate::tui::{EventHandler, Tui};

#[tokio::main]
async fn main() -> Result<()> {
    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::new(), Some(e)),
    };

    let log_path = logging::init(config.log_level.as_deref());
    if let Some(path) = &log_path {
        info!(path = %path.display(), "logging started");
    }
    if let Some(e) = config_error {
        warn!(error = %e, "could not read config, using defaults");
    }

    let mut app = App::new(config, clipboard::open());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    info!("session ended");
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    let tx = events.sender();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event, &tx)?,
            None => break,
        }
    }

    Ok(())
}
