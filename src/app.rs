//! Wires the transport, timer and renderer into a session and runs the screen

use anyhow::{Context, Result};
use crossterm::event::EventStream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::Config;
use crate::events::AppEvent;
use crate::render::MarkdownRenderer;
use crate::scheduler::TokioScheduler;
use crate::session::{ChatSession, SessionSettings};
use crate::transport::{self, ConnectionTarget};
use crate::ui::conversation::{ConversationAction, ConversationManager};
use crate::ui::terminal::{self, Tui};

/// Run the chat screen until the user quits
pub async fn run(config: Config) -> Result<()> {
    let target = ConnectionTarget::from_config(&config.server)
        .context("Invalid server configuration")?;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let outbox = transport::spawn(target, events_tx.clone());
    let session = ChatSession::new(
        SessionSettings::from(&config),
        Box::new(MarkdownRenderer::new(config.render.clone())),
        Box::new(outbox),
        Box::new(TokioScheduler::new(events_tx)),
    );
    let mut manager = ConversationManager::new(session);

    let mut tui = terminal::init_terminal().context("Failed to initialize terminal")?;
    info!("chat screen started");
    let result = event_loop(&mut tui, &mut manager, events_rx).await;

    if let Err(err) = terminal::restore_terminal() {
        warn!(error = %err, "failed to restore terminal");
    }
    info!("chat screen closed");
    result
}

async fn event_loop(
    tui: &mut Tui,
    manager: &mut ConversationManager,
    mut events_rx: mpsc::UnboundedReceiver<AppEvent>,
) -> Result<()> {
    let mut input = EventStream::new();

    loop {
        tui.draw(|frame| manager.render(frame))
            .context("Failed to draw frame")?;

        tokio::select! {
            event = input.next() => {
                let Some(event) = event else {
                    return Ok(());
                };
                let event = event.context("Failed to read terminal input")?;
                if manager.handle_terminal_event(event) == ConversationAction::Exit {
                    return Ok(());
                }
            }
            Some(event) = events_rx.recv() => {
                manager.handle_app_event(event);
            }
        }
    }
}
