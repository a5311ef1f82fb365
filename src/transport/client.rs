use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use url::Url;

use super::engineio::{EnginePacket, OpenHandshake};
use super::socketio::SocketPacket;
use super::{TransportHandle, decode_inbound};
use crate::config::{ServerConfig, WEBSOCKET_TRANSPORT};
use crate::error::TransportError;
use crate::events::{AppEvent, OutboundEvent, TransportEvent};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, WsMessage>;
type WsReader = SplitStream<WsStream>;

/// Fixed connection target: endpoint URL with the Engine.IO query and the namespace to join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub endpoint: Url,
    pub namespace: String,
}

impl ConnectionTarget {
    pub fn from_config(server: &ServerConfig) -> Result<Self, TransportError> {
        if server.transport != WEBSOCKET_TRANSPORT {
            return Err(TransportError::UnsupportedTransport(server.transport.clone()));
        }

        let invalid = |reason: String| TransportError::InvalidUrl {
            url: server.url.clone(),
            reason,
        };

        let mut endpoint = Url::parse(&server.url).map_err(|e| invalid(e.to_string()))?;
        let scheme = match endpoint.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(invalid(format!("unsupported scheme '{other}'"))),
        };
        endpoint
            .set_scheme(scheme)
            .map_err(|_| invalid("cannot switch to a websocket scheme".to_string()))?;

        if endpoint.path().is_empty() || endpoint.path() == "/" {
            endpoint.set_path("/socket.io/");
        }
        endpoint
            .query_pairs_mut()
            .clear()
            .append_pair("EIO", "4")
            .append_pair("transport", WEBSOCKET_TRANSPORT);

        Ok(Self {
            endpoint,
            namespace: server.namespace.clone(),
        })
    }
}

/// Connect in the background. Inbound events are forwarded to `events`; a
/// `Disconnected` event is emitted once if the connection ends on its own.
pub fn spawn(target: ConnectionTarget, events: mpsc::UnboundedSender<AppEvent>) -> TransportHandle {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        match run(&target, outbound_rx, &events).await {
            Ok(()) => info!("transport stopped"),
            Err(err) => {
                warn!(error = %err, endpoint = %target.endpoint, "transport connection ended");
                let _ = events.send(AppEvent::Transport(TransportEvent::Disconnected {
                    reason: err.to_string(),
                }));
            }
        }
    });

    TransportHandle::new(outbound_tx)
}

async fn run(
    target: &ConnectionTarget,
    mut outbound: mpsc::UnboundedReceiver<OutboundEvent>,
    events: &mpsc::UnboundedSender<AppEvent>,
) -> Result<(), TransportError> {
    info!(endpoint = %target.endpoint, namespace = %target.namespace, "connecting");

    let (mut writer, mut reader, handshake) =
        tokio::time::timeout(HANDSHAKE_TIMEOUT, open(target))
            .await
            .map_err(|_| TransportError::HandshakeTimeout(HANDSHAKE_TIMEOUT))??;

    let window = handshake.liveness_window();
    info!(sid = %handshake.sid, ?window, "engine.io session open");

    let mut joined = false;
    let deadline = tokio::time::sleep(window);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            frame = reader.next() => {
                let frame = frame.ok_or(TransportError::Closed)??;
                deadline.as_mut().reset(Instant::now() + window);

                let text = match frame {
                    WsMessage::Text(text) => text,
                    WsMessage::Close(frame) => {
                        debug!(?frame, "websocket close frame");
                        return Err(TransportError::Closed);
                    }
                    _ => continue,
                };

                match EnginePacket::decode(&text)? {
                    EnginePacket::Ping(data) => {
                        send_engine(&mut writer, EnginePacket::Pong(data)).await?;
                    }
                    EnginePacket::Close => return Err(TransportError::Closed),
                    EnginePacket::Message(data) => {
                        let packet = match SocketPacket::decode(&data) {
                            Ok(packet) => packet,
                            Err(err) => {
                                warn!(error = %err, "dropping malformed socket.io packet");
                                continue;
                            }
                        };
                        if packet.namespace() != target.namespace {
                            debug!(namespace = packet.namespace(), "packet for another namespace");
                            continue;
                        }
                        match packet {
                            SocketPacket::Connect { .. } => {
                                info!(namespace = %target.namespace, "joined namespace");
                                joined = true;
                            }
                            SocketPacket::ConnectError { .. } => {
                                let reason = packet.error_message().unwrap_or_default();
                                return Err(TransportError::ConnectRejected(reason));
                            }
                            SocketPacket::Disconnect { .. } => return Err(TransportError::Closed),
                            SocketPacket::Event { name, args, .. } => {
                                debug!(event = %name, "inbound event");
                                if let Some(event) = decode_inbound(&name, &args) {
                                    if events.send(AppEvent::Transport(event)).is_err() {
                                        return Ok(());
                                    }
                                }
                            }
                            SocketPacket::Ack { .. } => {}
                        }
                    }
                    other => debug!(?other, "ignoring engine.io packet"),
                }
            }
            event = outbound.recv(), if joined => {
                let Some(event) = event else {
                    let _ = writer.close().await;
                    return Ok(());
                };
                debug!(event = event.name(), "outbound event");
                let packet = SocketPacket::event(&target.namespace, event.name(), vec![event.payload()]);
                send_engine(&mut writer, EnginePacket::Message(packet.encode())).await?;
            }
            _ = &mut deadline => return Err(TransportError::HeartbeatTimeout(window)),
        }
    }
}

/// WebSocket connect, Engine.IO open packet, then the namespace CONNECT request
async fn open(target: &ConnectionTarget) -> Result<(WsWriter, WsReader, OpenHandshake), TransportError> {
    let (stream, _) = connect_async(target.endpoint.as_str()).await?;
    let (mut writer, mut reader) = stream.split();

    let handshake = loop {
        let frame = reader.next().await.ok_or(TransportError::Closed)??;
        let WsMessage::Text(text) = frame else {
            continue;
        };
        match EnginePacket::decode(&text)? {
            EnginePacket::Open(handshake) => break handshake,
            other => debug!(?other, "packet before open handshake"),
        }
    };

    let connect = SocketPacket::connect(&target.namespace);
    send_engine(&mut writer, EnginePacket::Message(connect.encode())).await?;
    Ok((writer, reader, handshake))
}

async fn send_engine(writer: &mut WsWriter, packet: EnginePacket) -> Result<(), TransportError> {
    writer.send(WsMessage::Text(packet.encode())).await?;
    Ok(())
}
