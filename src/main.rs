use anyhow::Result;
use tracing::{info, warn};

mod app;
mod backend;
mod config;
mod conversation;
mod decode;
mod error;
mod handler;
mod logging;
mod session;
mod stream;
mod tui;
mod ui;

use app::App;
use config::Config;
use tui::EventHandler;

#[tokio::main]
async fn main() -> Result<()> {
    let log_path = logging::init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "could not read config, using defaults");
            Config::new()
        }
    };

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, &config).await;

    tui::restore()?;
    if let (Err(_), Some(path)) = (&result, &log_path) {
        eprintln!("log: {}", path.display());
    }
    result
}

async fn run(terminal: &mut tui::Tui, config: &Config) -> Result<()> {
    let mut events = EventHandler::new();
    let mut app = App::new(config, events.sender());
    info!(endpoint = %app.endpoint, "chat session started");

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(&mut app, event);
    }

    info!(turns = app.session.conversation().len(), "chat session closed");
    Ok(())
}
