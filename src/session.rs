//! Conversation session controller
//!
//! Owns the message flow of one conversation: submitting user text, tracking
//! the single outstanding request and its typing indicator, and resolving it
//! when a reply or an error arrives. Transport, renderer and timer are
//! injected so the whole lifecycle can be driven directly from tests.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::events::{IndicatorId, Message, OutboundEvent, TransportEvent};
use crate::render::Renderer;
use crate::scheduler::{RepeatingTask, Scheduler};
use crate::transport::Outbox;
use crate::ui::conversation::{ConversationComposer, ConversationHistory};

pub const ERROR_PREFIX: &str = "🚨 **ERRO CÓSMICO!** ";
pub const ERROR_FALLBACK: &str = "Erro desconhecido.";
pub const DEFAULT_STATUS: &str = "Conectado ao servidor!";
pub const TIMEOUT_MESSAGE: &str = "Tempo de resposta esgotado.";
pub const SEND_FAILED_MESSAGE: &str = "Sem conexão com o servidor.";
pub const INPUT_PLACEHOLDER: &str = "Pergunte algo ao Astrolino...";

/// Timing knobs of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub indicator_period: Duration,
    /// `None` waits for a reply forever
    pub reply_timeout: Option<Duration>,
    pub max_messages: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            indicator_period: config.indicator_period(),
            reply_timeout: config.reply_timeout(),
            max_messages: config.ui.max_messages,
        }
    }
}

/// The one request awaiting a reply
#[derive(Debug)]
struct PendingRequest {
    indicator: IndicatorId,
    task: RepeatingTask,
    ticks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input; nothing happened
    Ignored,
    Sent,
    /// The transport refused the message; it was reported as an error
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// The tick names an indicator that is gone
    Stop,
    /// The reply timeout elapsed and the request was resolved as an error
    TimedOut,
}

pub struct ChatSession {
    history: ConversationHistory,
    composer: ConversationComposer,
    pending: Option<PendingRequest>,
    renderer: Box<dyn Renderer>,
    outbox: Box<dyn Outbox>,
    scheduler: Box<dyn Scheduler>,
    settings: SessionSettings,
    next_indicator: u64,
}

impl ChatSession {
    pub fn new(
        settings: SessionSettings,
        renderer: Box<dyn Renderer>,
        outbox: Box<dyn Outbox>,
        scheduler: Box<dyn Scheduler>,
    ) -> Self {
        let mut composer = ConversationComposer::new(INPUT_PLACEHOLDER);
        composer.set_focus(true);

        Self {
            history: ConversationHistory::new(settings.max_messages),
            composer,
            pending: None,
            renderer,
            outbox,
            scheduler,
            settings,
            next_indicator: 1,
        }
    }

    /// Send `text` as a user message. Blank text is ignored.
    pub fn submit(&mut self, text: &str) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::Ignored;
        }

        self.history.push_message(Message::user(text));
        self.begin_pending();

        let outcome = match self
            .outbox
            .send(OutboundEvent::SendMessage(text.to_string()))
        {
            Ok(()) => {
                debug!(chars = text.chars().count(), "message sent");
                SubmitOutcome::Sent
            }
            Err(err) => {
                warn!(error = %err, "failed to hand message to transport");
                self.on_error(Some(SEND_FAILED_MESSAGE));
                SubmitOutcome::Failed
            }
        };

        self.composer.clear();
        outcome
    }

    fn begin_pending(&mut self) {
        if let Some(pending) = &self.pending {
            debug!(indicator = pending.indicator.0, "request already pending");
            return;
        }

        let indicator = IndicatorId(self.next_indicator);
        self.next_indicator += 1;

        self.history.push_indicator(indicator);
        let task = self
            .scheduler
            .start(self.settings.indicator_period, indicator);
        self.composer.set_enabled(false);

        self.pending = Some(PendingRequest {
            indicator,
            task,
            ticks: 0,
        });
    }

    /// Tear down the pending request. Returns false when nothing was pending.
    pub fn resolve(&mut self) -> bool {
        let Some(mut pending) = self.pending.take() else {
            return false;
        };

        pending.task.cancel();
        self.history.remove_indicator(pending.indicator);
        self.composer.set_enabled(true);
        true
    }

    pub fn on_reply(&mut self, text: &str) {
        self.resolve();
        self.push_bot(text);
        self.composer.set_focus(true);
    }

    pub fn on_error(&mut self, error: Option<&str>) {
        self.resolve();
        let detail = error
            .map(str::trim)
            .filter(|detail| !detail.is_empty())
            .unwrap_or(ERROR_FALLBACK);
        self.push_bot(&format!("{ERROR_PREFIX}{detail}"));
        self.composer.set_focus(true);
    }

    pub fn on_status(&mut self, status: Option<&str>) {
        let text = status
            .filter(|status| !status.trim().is_empty())
            .unwrap_or(DEFAULT_STATUS);
        self.push_bot(text);
    }

    /// Local bot-side notice (help text and the like)
    pub fn notice(&mut self, text: &str) {
        self.push_bot(text);
    }

    pub fn apply(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Reply(text) => self.on_reply(&text),
            TransportEvent::Error(error) => self.on_error(error.as_deref()),
            TransportEvent::Status(status) => self.on_status(status.as_deref()),
            TransportEvent::Disconnected { reason } => {
                info!(%reason, "server connection lost");
                self.on_error(Some(&format!("Conexão encerrada: {reason}")));
            }
        }
    }

    /// Advance the typing animation; also enforces the reply timeout
    pub fn on_indicator_tick(&mut self, indicator: IndicatorId) -> TickOutcome {
        let Some(pending) = self.pending.as_mut() else {
            return TickOutcome::Stop;
        };
        if pending.indicator != indicator || !self.history.advance_indicator(indicator) {
            return TickOutcome::Stop;
        }

        pending.ticks = pending.ticks.saturating_add(1);
        if let Some(timeout) = self.settings.reply_timeout {
            if self.settings.indicator_period.saturating_mul(pending.ticks) >= timeout {
                warn!(?timeout, "no reply from server");
                self.on_error(Some(TIMEOUT_MESSAGE));
                return TickOutcome::TimedOut;
            }
        }
        TickOutcome::Continue
    }

    /// Empty the visible log; a pending request keeps its indicator
    pub fn clear_log(&mut self) {
        self.history.clear_messages();
    }

    fn push_bot(&mut self, text: &str) {
        let body = self.renderer.render(text);
        self.history.push_message(Message::bot(text, body));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut ConversationHistory {
        &mut self.history
    }

    pub fn composer(&self) -> &ConversationComposer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut ConversationComposer {
        &mut self.composer
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }
}
