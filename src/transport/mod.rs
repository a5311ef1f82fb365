//! Socket.IO client used to talk to the chat service
//!
//! Only the WebSocket transport is spoken; there is no long-polling fallback
//! and no reconnection.

pub mod client;
pub mod engineio;
pub mod socketio;

use anyhow::{Result, anyhow};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::events::{ErrorPayload, NewMessagePayload, OutboundEvent, StatusPayload, TransportEvent};

pub use client::{ConnectionTarget, spawn};

pub const NEW_MESSAGE: &str = "nova_mensagem";
pub const ERROR: &str = "erro";
pub const CONNECTION_STATUS: &str = "status_conexao";

/// Where the session hands outbound events
pub trait Outbox {
    fn send(&mut self, event: OutboundEvent) -> Result<()>;
}

/// Sending half of a running transport connection
#[derive(Debug, Clone)]
pub struct TransportHandle {
    outbound: mpsc::UnboundedSender<OutboundEvent>,
}

impl TransportHandle {
    pub fn new(outbound: mpsc::UnboundedSender<OutboundEvent>) -> Self {
        Self { outbound }
    }
}

impl Outbox for TransportHandle {
    fn send(&mut self, event: OutboundEvent) -> Result<()> {
        self.outbound
            .send(event)
            .map_err(|_| anyhow!("transport connection is closed"))
    }
}

/// Map an inbound Socket.IO event onto a transport event. Unknown events yield `None`.
pub fn decode_inbound(name: &str, args: &[Value]) -> Option<TransportEvent> {
    let payload = args.first().cloned().unwrap_or(Value::Null);
    match name {
        NEW_MESSAGE => {
            let payload: NewMessagePayload = serde_json::from_value(payload).unwrap_or_default();
            Some(TransportEvent::Reply(payload.texto))
        }
        ERROR => {
            let payload: ErrorPayload = serde_json::from_value(payload).unwrap_or_default();
            Some(TransportEvent::Error(payload.detail()))
        }
        CONNECTION_STATUS => {
            let payload: StatusPayload = serde_json::from_value(payload).unwrap_or_default();
            Some(TransportEvent::Status(payload.text()))
        }
        other => {
            debug!(event = other, "ignoring unknown inbound event");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_reply_error_and_status() {
        assert_eq!(
            decode_inbound(NEW_MESSAGE, &[json!({ "texto": "**Olá**" })]),
            Some(TransportEvent::Reply("**Olá**".to_string()))
        );
        assert_eq!(
            decode_inbound(ERROR, &[json!({ "erro": "disk full" })]),
            Some(TransportEvent::Error(Some("disk full".to_string())))
        );
        assert_eq!(
            decode_inbound(CONNECTION_STATUS, &[json!({ "mensagem": "Bem-vindo" })]),
            Some(TransportEvent::Status(Some("Bem-vindo".to_string())))
        );
    }

    #[test]
    fn missing_or_malformed_payloads_degrade_to_absent() {
        assert_eq!(decode_inbound(ERROR, &[]), Some(TransportEvent::Error(None)));
        assert_eq!(
            decode_inbound(ERROR, &[json!("boom")]),
            Some(TransportEvent::Error(None))
        );
        assert_eq!(
            decode_inbound(CONNECTION_STATUS, &[json!({})]),
            Some(TransportEvent::Status(None))
        );
    }

    #[test]
    fn unknown_events_are_ignored() {
        assert_eq!(decode_inbound("typing", &[json!({})]), None);
    }

    #[test]
    fn handle_reports_closed_connection() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut handle = TransportHandle::new(tx);
        assert!(handle.send(OutboundEvent::SendMessage("oi".into())).is_ok());
        drop(rx);
        assert!(handle.send(OutboundEvent::SendMessage("oi".into())).is_err());
    }
}
