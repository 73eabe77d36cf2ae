//! Framed WebSocket Transport
//!
//! socket.io-style event framing over a WebSocket connection. The dialect is
//! the EIO=3 generation the game servers speak:
//!
//! ```text
//! 0{json}   engine.io open (carries pingInterval)
//! 1         engine.io close
//! 2 / 3     engine.io ping / pong
//! 40        namespace connected
//! 41        namespace disconnect
//! 42[c,...] event: numeric code followed by its arguments
//! ```
//!
//! [`Connection::connect`] performs the handshake and spawns a reader task
//! (packets in, [`Frame`]s out, pong replies) and a writer task (packet
//! queue out, periodic pings). Sessions consume the frame stream and keep a
//! [`CommandSender`] for outgoing numbered commands.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, warn};

/// Queue depth for outgoing packets.
const OUTGOING_CAPACITY: usize = 64;

/// Queue depth for inbound frames.
const FRAME_CAPACITY: usize = 256;

/// Ping cadence to fall back on when the open packet does not advertise one.
const DEFAULT_PING_INTERVAL: std::time::Duration = std::time::Duration::from_secs(25);

/// Transport failure.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The WebSocket layer failed.
    #[error("websocket error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),

    /// The server never completed the open handshake.
    #[error("transport handshake failed: {0}")]
    Handshake(String),

    /// The connection is gone; nothing more can be sent.
    #[error("transport is closed")]
    Closed,
}

/// One inbound item from the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// The event channel is up; commands may now be sent.
    Connected,
    /// A numbered server event with its JSON arguments.
    Event {
        /// Numeric event code.
        code: u32,
        /// Positional JSON arguments.
        args: Vec<Value>,
    },
    /// The connection ended (either side).
    Disconnected,
}

/// Parsed wire packet.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Packet {
    Open(String),
    Close,
    Ping,
    Pong,
    NamespaceConnected,
    NamespaceDisconnect,
    Event { code: u32, args: Vec<Value> },
    Other(String),
}

/// Parse one wire packet.
pub(crate) fn parse_packet(text: &str) -> Packet {
    if let Some(rest) = text.strip_prefix("42") {
        return match serde_json::from_str::<Vec<Value>>(rest) {
            Ok(items) if !items.is_empty() => {
                let code = match &items[0] {
                    Value::Number(n) => n.as_u64(),
                    Value::String(s) => s.parse::<u64>().ok(),
                    _ => None,
                };
                match code {
                    Some(code) => Packet::Event {
                        code: code as u32,
                        args: items[1..].to_vec(),
                    },
                    None => {
                        warn!("event packet with non-numeric code: {text}");
                        Packet::Other(text.to_string())
                    }
                }
            }
            _ => {
                warn!("unparseable event packet: {text}");
                Packet::Other(text.to_string())
            }
        };
    }
    if text.starts_with("40") {
        return Packet::NamespaceConnected;
    }
    if text.starts_with("41") {
        return Packet::NamespaceDisconnect;
    }
    if let Some(rest) = text.strip_prefix('0') {
        return Packet::Open(rest.to_string());
    }
    match text {
        "1" => Packet::Close,
        "2" => Packet::Ping,
        "3" => Packet::Pong,
        _ => Packet::Other(text.to_string()),
    }
}

/// Encode a numbered event packet.
pub(crate) fn encode_event(code: u32, payload: Option<&Value>) -> String {
    let arr = match payload {
        Some(p) => json!([code, p]),
        None => json!([code]),
    };
    format!("42{arr}")
}

/// Ping interval advertised by an engine.io open packet.
fn ping_interval_from_open(open_payload: &str) -> std::time::Duration {
    serde_json::from_str::<Value>(open_payload)
        .ok()
        .and_then(|v| v.get("pingInterval").and_then(Value::as_u64))
        .map(std::time::Duration::from_millis)
        .unwrap_or(DEFAULT_PING_INTERVAL)
}

/// Sender half of a connection: outgoing numbered commands.
#[derive(Clone, Debug)]
pub struct CommandSender {
    pkt_tx: mpsc::Sender<String>,
}

impl CommandSender {
    /// Emit a numbered command with an optional JSON payload.
    pub async fn emit(&self, code: u32, payload: Option<Value>) -> Result<(), TransportError> {
        let pkt = encode_event(code, payload.as_ref());
        self.pkt_tx
            .send(pkt)
            .await
            .map_err(|_| TransportError::Closed)
    }

    /// Send the namespace disconnect packet and let the writer wind down.
    pub async fn close(&self) {
        let _ = self.pkt_tx.send("41".to_string()).await;
    }
}

/// An open, event-framed connection.
pub struct Connection {
    pub(crate) commands: CommandSender,
    pub(crate) frames: mpsc::Receiver<Frame>,
    pub(crate) io_tasks: Vec<JoinHandle<()>>,
}

impl Connection {
    /// Connect to a socket address and complete the transport handshake.
    ///
    /// A [`Frame::Connected`] is delivered once the server confirms the
    /// namespace, after which numbered events flow until either side
    /// disconnects.
    pub async fn connect(address: &str) -> Result<Connection, TransportError> {
        debug!("connecting transport to {address}");
        let (ws, _response) = connect_async(address).await?;
        let (mut sink, mut stream) = ws.split();

        // The open packet arrives first and carries the ping cadence.
        let open_payload = loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => match parse_packet(&text) {
                    Packet::Open(payload) => break payload,
                    other => debug!("pre-open packet ignored: {other:?}"),
                },
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(TransportError::Ws(e)),
                None => {
                    return Err(TransportError::Handshake(
                        "connection closed before open packet".into(),
                    ))
                }
            }
        };
        let ping_interval = ping_interval_from_open(&open_payload);

        let (pkt_tx, mut pkt_rx) = mpsc::channel::<String>(OUTGOING_CAPACITY);
        let (frame_tx, frame_rx) = mpsc::channel::<Frame>(FRAME_CAPACITY);

        // Reader: wire packets -> frames; answers server pings.
        let pong_tx = pkt_tx.clone();
        let reader = tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                match message {
                    Ok(Message::Text(text)) => match parse_packet(&text) {
                        Packet::NamespaceConnected => {
                            if frame_tx.send(Frame::Connected).await.is_err() {
                                break;
                            }
                        }
                        Packet::Event { code, args } => {
                            if frame_tx.send(Frame::Event { code, args }).await.is_err() {
                                break;
                            }
                        }
                        Packet::Ping => {
                            let _ = pong_tx.send("3".to_string()).await;
                        }
                        Packet::Close | Packet::NamespaceDisconnect => {
                            let _ = frame_tx.send(Frame::Disconnected).await;
                            break;
                        }
                        Packet::Pong | Packet::Open(_) => {}
                        Packet::Other(pkt) => debug!("ignoring unknown packet: {pkt}"),
                    },
                    Ok(Message::Close(_)) => {
                        let _ = frame_tx.send(Frame::Disconnected).await;
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("websocket read error: {e}");
                        let _ = frame_tx.send(Frame::Disconnected).await;
                        break;
                    }
                }
            }
            debug!("transport reader ended");
        });

        // Writer: packet queue -> wire; periodic engine.io pings.
        let writer = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + ping_interval;
            let mut ping = tokio::time::interval_at(start, ping_interval);
            loop {
                tokio::select! {
                    pkt = pkt_rx.recv() => match pkt {
                        Some(pkt) => {
                            let disconnecting = pkt == "41";
                            if let Err(e) = sink.send(Message::Text(pkt)).await {
                                error!("websocket write error: {e}");
                                break;
                            }
                            if disconnecting {
                                let _ = sink.send(Message::Close(None)).await;
                                break;
                            }
                        }
                        None => {
                            let _ = sink.send(Message::Close(None)).await;
                            break;
                        }
                    },
                    _ = ping.tick() => {
                        if sink.send(Message::Text("2".to_string())).await.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("transport writer ended");
        });

        Ok(Connection {
            commands: CommandSender { pkt_tx },
            frames: frame_rx,
            io_tasks: vec![reader, writer],
        })
    }

    /// In-memory connection for exercising the session machinery without a
    /// server: returns the connection plus an injector for inbound frames
    /// and a receiver of raw outgoing packets.
    pub(crate) fn pair() -> (Connection, mpsc::Sender<Frame>, mpsc::Receiver<String>) {
        let (pkt_tx, pkt_rx) = mpsc::channel::<String>(OUTGOING_CAPACITY);
        let (frame_tx, frame_rx) = mpsc::channel::<Frame>(FRAME_CAPACITY);
        let connection = Connection {
            commands: CommandSender { pkt_tx },
            frames: frame_rx,
            io_tasks: Vec::new(),
        };
        (connection, frame_tx, pkt_rx)
    }
}
