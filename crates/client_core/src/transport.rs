//! Game-server transport: JSON text frames over a websocket.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use shared::protocol::{ClientRequest, ServerEvent};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

/// What a live connection reports back, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Event(ServerEvent),
    Malformed(String),
    /// The link is gone. `None` for an orderly close.
    Closed(Option<String>),
}

#[async_trait]
pub trait GameServerConnector: Send + Sync {
    async fn connect(
        &self,
        server_url: &str,
        inbound: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Arc<dyn GameServerConnection>>;
}

pub trait GameServerConnection: Send + Sync {
    fn send(&self, request: ClientRequest) -> Result<()>;
    fn close(&self);
}

pub struct MissingGameServerConnector;

#[async_trait]
impl GameServerConnector for MissingGameServerConnector {
    async fn connect(
        &self,
        _server_url: &str,
        _inbound: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Arc<dyn GameServerConnection>> {
        Err(anyhow!("game server transport is not configured"))
    }
}

/// Maps `http(s)://` onto `ws(s)://`; websocket URLs pass through.
pub fn websocket_url(server_url: &str) -> Result<Url> {
    let mut url = Url::parse(server_url)
        .with_context(|| format!("invalid game server URL: {server_url}"))?;
    let scheme = match url.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => bail!("unsupported game server URL scheme: {other}"),
    };
    if url.scheme() != scheme && url.set_scheme(scheme).is_err() {
        bail!("invalid game server URL: {server_url}");
    }
    Ok(url)
}

pub struct WebSocketConnector;

#[async_trait]
impl GameServerConnector for WebSocketConnector {
    async fn connect(
        &self,
        server_url: &str,
        inbound: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Arc<dyn GameServerConnection>> {
        let ws_url = websocket_url(server_url)?;
        let (ws_stream, _) = connect_async(ws_url.as_str())
            .await
            .with_context(|| format!("failed to connect websocket: {ws_url}"))?;
        info!(url = %ws_url, "transport: websocket connected");
        let (mut ws_writer, mut ws_reader) = ws_stream.split();

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let writer_task = tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if let Err(err) = ws_writer.send(msg).await {
                    warn!(error = %err, "transport: websocket send failed");
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        let reader_task = tokio::spawn(async move {
            let mut reason = None;
            while let Some(msg) = ws_reader.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        let event = match serde_json::from_str::<ServerEvent>(&text) {
                            Ok(event) => TransportEvent::Event(event),
                            Err(err) => TransportEvent::Malformed(format!(
                                "invalid server event: {err}"
                            )),
                        };
                        if inbound.send(event).is_err() {
                            return;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        reason = Some(format!("websocket receive failed: {err}"));
                        break;
                    }
                }
            }
            debug!(?reason, "transport: websocket reader finished");
            let _ = inbound.send(TransportEvent::Closed(reason));
        });

        Ok(Arc::new(WebSocketConnection {
            outbound,
            reader_task,
            writer_task,
        }))
    }
}

struct WebSocketConnection {
    outbound: mpsc::UnboundedSender<Message>,
    reader_task: JoinHandle<()>,
    writer_task: JoinHandle<()>,
}

impl GameServerConnection for WebSocketConnection {
    fn send(&self, request: ClientRequest) -> Result<()> {
        let text = serde_json::to_string(&request)?;
        self.outbound
            .send(Message::Text(text))
            .map_err(|_| anyhow!("websocket is closed"))
    }

    fn close(&self) {
        self.reader_task.abort();
        if self.outbound.send(Message::Close(None)).is_err() {
            self.writer_task.abort();
        }
    }
}

impl Drop for WebSocketConnection {
    // The writer drains and exits once `outbound` is dropped.
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
