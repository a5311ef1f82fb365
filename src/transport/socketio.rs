//! Socket.IO v5 packets carried inside Engine.IO messages

use serde_json::Value;

use crate::error::ProtocolError;

pub const DEFAULT_NAMESPACE: &str = "/";

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        payload: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        id: u64,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        payload: Option<Value>,
    },
}

impl SocketPacket {
    pub fn connect(namespace: &str) -> Self {
        SocketPacket::Connect {
            namespace: namespace.to_string(),
            payload: None,
        }
    }

    pub fn event(namespace: &str, name: &str, args: Vec<Value>) -> Self {
        SocketPacket::Event {
            namespace: namespace.to_string(),
            id: None,
            name: name.to_string(),
            args,
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            SocketPacket::Connect { namespace, .. }
            | SocketPacket::Disconnect { namespace }
            | SocketPacket::Event { namespace, .. }
            | SocketPacket::Ack { namespace, .. }
            | SocketPacket::ConnectError { namespace, .. } => namespace,
        }
    }

    pub fn decode(data: &str) -> Result<Self, ProtocolError> {
        let mut chars = data.chars();
        let kind = chars.next().ok_or(ProtocolError::EmptyFrame)?;
        let rest = chars.as_str();

        if matches!(kind, '5' | '6') {
            return Err(ProtocolError::BinaryUnsupported);
        }

        let (namespace, rest) = split_namespace(rest);
        let (id, rest) = split_id(rest);
        let payload = if rest.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<Value>(rest)
                    .map_err(|e| ProtocolError::InvalidPayload(e.to_string()))?,
            )
        };

        match kind {
            '0' => Ok(SocketPacket::Connect { namespace, payload }),
            '1' => Ok(SocketPacket::Disconnect { namespace }),
            '2' => {
                let mut args = match payload {
                    Some(Value::Array(args)) => args,
                    other => {
                        return Err(ProtocolError::InvalidPayload(format!(
                            "event payload must be an array, got {other:?}"
                        )));
                    }
                };
                if args.is_empty() {
                    return Err(ProtocolError::InvalidPayload(
                        "event without a name".to_string(),
                    ));
                }
                let name = match args.remove(0) {
                    Value::String(name) => name,
                    other => {
                        return Err(ProtocolError::InvalidPayload(format!(
                            "event name must be a string, got {other}"
                        )));
                    }
                };
                Ok(SocketPacket::Event {
                    namespace,
                    id,
                    name,
                    args,
                })
            }
            '3' => {
                let id = id.ok_or_else(|| {
                    ProtocolError::InvalidPayload("ack without an id".to_string())
                })?;
                let args = match payload {
                    Some(Value::Array(args)) => args,
                    Some(other) => vec![other],
                    None => Vec::new(),
                };
                Ok(SocketPacket::Ack {
                    namespace,
                    id,
                    args,
                })
            }
            '4' => Ok(SocketPacket::ConnectError { namespace, payload }),
            other => Err(ProtocolError::UnknownSocketType(other)),
        }
    }

    pub fn encode(&self) -> String {
        let (kind, id, payload) = match self {
            SocketPacket::Connect { payload, .. } => ('0', None, payload.clone()),
            SocketPacket::Disconnect { .. } => ('1', None, None),
            SocketPacket::Event { id, name, args, .. } => {
                let mut array = Vec::with_capacity(args.len() + 1);
                array.push(Value::String(name.clone()));
                array.extend(args.iter().cloned());
                ('2', *id, Some(Value::Array(array)))
            }
            SocketPacket::Ack { id, args, .. } => ('3', Some(*id), Some(Value::Array(args.clone()))),
            SocketPacket::ConnectError { payload, .. } => ('4', None, payload.clone()),
        };

        let mut out = String::new();
        out.push(kind);
        let namespace = self.namespace();
        if namespace != DEFAULT_NAMESPACE {
            out.push_str(namespace);
            out.push(',');
        }
        if let Some(id) = id {
            out.push_str(&id.to_string());
        }
        if let Some(payload) = payload {
            out.push_str(&payload.to_string());
        }
        out
    }

    /// Human-readable reason carried by a CONNECT_ERROR packet
    pub fn error_message(&self) -> Option<String> {
        let SocketPacket::ConnectError { payload, .. } = self else {
            return None;
        };
        Some(match payload {
            Some(Value::Object(map)) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
            Some(Value::String(message)) => message.clone(),
            Some(other) => other.to_string(),
            None => "connection refused".to_string(),
        })
    }
}

fn split_namespace(rest: &str) -> (String, &str) {
    if !rest.starts_with('/') {
        return (DEFAULT_NAMESPACE.to_string(), rest);
    }
    match rest.find(',') {
        Some(comma) => (rest[..comma].to_string(), &rest[comma + 1..]),
        None => (rest.to_string(), ""),
    }
}

fn split_id(rest: &str) -> (Option<u64>, &str) {
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return (None, rest);
    }
    match rest[..digits].parse() {
        Ok(id) => (Some(id), &rest[digits..]),
        Err(_) => (None, rest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_event_on_default_namespace() {
        let packet = SocketPacket::decode(r#"2["nova_mensagem",{"texto":"Olá, viajante!"}]"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Event {
                namespace: "/".to_string(),
                id: None,
                name: "nova_mensagem".to_string(),
                args: vec![json!({ "texto": "Olá, viajante!" })],
            }
        );
    }

    #[test]
    fn decodes_namespace_and_ack_id() {
        let packet = SocketPacket::decode(r#"2/chat,12["erro",{}]"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Event {
                namespace: "/chat".to_string(),
                id: Some(12),
                name: "erro".to_string(),
                args: vec![json!({})],
            }
        );
    }

    #[test]
    fn encodes_connect_and_event() {
        assert_eq!(SocketPacket::connect("/").encode(), "0");
        assert_eq!(SocketPacket::connect("/chat").encode(), "0/chat,");

        let packet = SocketPacket::event("/", "enviar_mensagem", vec![json!({ "mensagem": "oi" })]);
        assert_eq!(packet.encode(), r#"2["enviar_mensagem",{"mensagem":"oi"}]"#);
    }

    #[test]
    fn connect_ack_carries_sid() {
        let packet = SocketPacket::decode(r#"0{"sid":"abc"}"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Connect {
                namespace: "/".to_string(),
                payload: Some(json!({ "sid": "abc" })),
            }
        );
    }

    #[test]
    fn connect_error_message_is_extracted() {
        let packet = SocketPacket::decode(r#"4{"message":"Not authorized"}"#).unwrap();
        assert_eq!(packet.error_message().as_deref(), Some("Not authorized"));
        assert_eq!(SocketPacket::connect("/").error_message(), None);
    }

    #[test]
    fn disconnect_on_namespace_without_comma() {
        assert_eq!(
            SocketPacket::decode("1/chat").unwrap(),
            SocketPacket::Disconnect {
                namespace: "/chat".to_string()
            }
        );
    }

    #[test]
    fn rejects_binary_and_malformed_events() {
        assert_eq!(
            SocketPacket::decode(r#"51-["upload",{"_placeholder":true,"num":0}]"#),
            Err(ProtocolError::BinaryUnsupported)
        );
        assert!(matches!(
            SocketPacket::decode(r#"2{"texto":"oi"}"#),
            Err(ProtocolError::InvalidPayload(_))
        ));
        assert!(matches!(
            SocketPacket::decode("2[42]"),
            Err(ProtocolError::InvalidPayload(_))
        ));
        assert_eq!(
            SocketPacket::decode("7"),
            Err(ProtocolError::UnknownSocketType('7'))
        );
    }
}
