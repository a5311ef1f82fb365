//! Engine.IO v4 text framing

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Open handshake sent by the server as the first packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

impl OpenHandshake {
    /// How long the connection may stay silent before it is considered dead
    pub fn liveness_window(&self) -> Duration {
        Duration::from_millis(self.ping_interval + self.ping_timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    Open(OpenHandshake),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let mut chars = frame.chars();
        let kind = chars.next().ok_or(ProtocolError::EmptyFrame)?;
        let data = chars.as_str();

        match kind {
            '0' => serde_json::from_str(data)
                .map(EnginePacket::Open)
                .map_err(|e| ProtocolError::InvalidHandshake(e.to_string())),
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(data.to_string())),
            '3' => Ok(EnginePacket::Pong(data.to_string())),
            '4' => Ok(EnginePacket::Message(data.to_string())),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(ProtocolError::UnknownEngineType(other)),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(handshake) => {
                format!("0{}", serde_json::json!(handshake))
            }
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{data}"),
            EnginePacket::Pong(data) => format!("3{data}"),
            EnginePacket::Message(data) => format!("4{data}"),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_open_handshake() {
        let packet = EnginePacket::decode(
            r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#,
        )
        .unwrap();

        let EnginePacket::Open(handshake) = packet else {
            panic!("expected open packet, got {packet:?}");
        };
        assert_eq!(handshake.sid, "lv_VI97HAXpY6yYWAAAC");
        assert_eq!(handshake.max_payload, Some(1_000_000));
        assert_eq!(handshake.liveness_window(), Duration::from_secs(45));
    }

    #[test]
    fn ping_echoes_probe_payload() {
        assert_eq!(
            EnginePacket::decode("2probe").unwrap(),
            EnginePacket::Ping("probe".to_string())
        );
        assert_eq!(EnginePacket::Pong("probe".to_string()).encode(), "3probe");
        assert_eq!(EnginePacket::Pong(String::new()).encode(), "3");
    }

    #[test]
    fn message_keeps_inner_packet() {
        assert_eq!(
            EnginePacket::decode(r#"42["nova_mensagem",{"texto":"oi"}]"#).unwrap(),
            EnginePacket::Message(r#"2["nova_mensagem",{"texto":"oi"}]"#.to_string())
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(EnginePacket::decode(""), Err(ProtocolError::EmptyFrame));
        assert_eq!(
            EnginePacket::decode("9"),
            Err(ProtocolError::UnknownEngineType('9'))
        );
        assert!(matches!(
            EnginePacket::decode("0{not json"),
            Err(ProtocolError::InvalidHandshake(_))
        ));
    }
}
