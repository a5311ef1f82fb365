use chrono::{DateTime, Local};
use serde::Deserialize;

use crate::render::RenderedText;

/// Events delivered to the application loop from background tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Something arrived from (or happened to) the server connection
    Transport(TransportEvent),

    /// The typing indicator animation is due for its next frame
    IndicatorTick(IndicatorId),
}

/// Inbound notifications from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// `nova_mensagem`: the bot answered
    Reply(String),

    /// `erro`: the server reported a failure, possibly without detail
    Error(Option<String>),

    /// `status_conexao`: connection status notice, possibly without text
    Status(Option<String>),

    /// The connection is gone and will not come back
    Disconnected { reason: String },
}

/// Outbound events sent to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    /// `enviar_mensagem`
    SendMessage(String),
}

impl OutboundEvent {
    pub const SEND_MESSAGE: &'static str = "enviar_mensagem";

    /// Event name on the wire
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::SendMessage(_) => Self::SEND_MESSAGE,
        }
    }

    /// Event payload on the wire
    pub fn payload(&self) -> serde_json::Value {
        match self {
            OutboundEvent::SendMessage(text) => serde_json::json!({ "mensagem": text }),
        }
    }
}

/// Identifies one typing indicator placeholder in the conversation log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndicatorId(pub u64);

#[derive(Debug, Default, Deserialize)]
pub struct NewMessagePayload {
    #[serde(default)]
    pub texto: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub erro: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusPayload {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub mensagem: Option<String>,
}

impl StatusPayload {
    /// `data` wins over `mensagem`; empty strings count as absent
    pub fn text(self) -> Option<String> {
        non_empty(self.data).or_else(|| non_empty(self.mensagem))
    }
}

impl ErrorPayload {
    pub fn detail(self) -> Option<String> {
        non_empty(self.erro)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

/// A message shown in the conversation log. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    pub body: RenderedText,
    pub timestamp: DateTime<Local>,
}

impl Message {
    /// User text is never run through the markup renderer, only sanitized
    pub fn user(text: impl Into<String>) -> Self {
        let text = text.into();
        let body = RenderedText::plain(&text);
        Self {
            sender: Sender::User,
            text,
            body,
            timestamp: Local::now(),
        }
    }

    pub fn bot(text: impl Into<String>, body: RenderedText) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
            body,
            timestamp: Local::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_message_payload_uses_wire_field_name() {
        let event = OutboundEvent::SendMessage("olá".to_string());
        assert_eq!(event.name(), "enviar_mensagem");
        assert_eq!(event.payload(), serde_json::json!({ "mensagem": "olá" }));
    }

    #[test]
    fn status_text_prefers_data_over_mensagem() {
        let payload: StatusPayload =
            serde_json::from_value(serde_json::json!({ "data": "pronto", "mensagem": "oi" }))
                .unwrap();
        assert_eq!(payload.text().as_deref(), Some("pronto"));

        let payload: StatusPayload =
            serde_json::from_value(serde_json::json!({ "data": "", "mensagem": "oi" })).unwrap();
        assert_eq!(payload.text().as_deref(), Some("oi"));

        assert_eq!(StatusPayload::default().text(), None);
    }

    #[test]
    fn blank_error_detail_is_absent() {
        let payload: ErrorPayload =
            serde_json::from_value(serde_json::json!({ "erro": "  " })).unwrap();
        assert_eq!(payload.detail(), None);
    }
}
