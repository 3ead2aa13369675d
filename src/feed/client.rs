//! Reconnecting WebSocket client for the broker bridge.
//!
//! One task owns the socket: it subscribes the tracked contracts on every
//! (re)connect, folds incoming messages into the snapshot store, and on
//! shutdown unsubscribes everything before releasing the connection. The
//! sampling loop never touches the network.

use std::sync::Arc;
use std::time::Duration;

use futures::{Sink, SinkExt, StreamExt};
use tokio::sync::{mpsc, watch, Mutex};
use tokio_tungstenite::{connect_async, tungstenite, tungstenite::Message};
use tracing::{debug, error, info, warn};

use super::types::{BridgeMessage, BridgeRequest, ContractSpec};
use super::SnapshotStore;
use crate::config::DEFAULT_BRIDGE_WS_URL;
use crate::error::MonitorError;
use crate::universe::{OptionChain, Universe};

/// Bridge client configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Bridge WebSocket URL.
    pub url: String,
    /// Delay between reconnection attempts.
    pub reconnect_delay: Duration,
    /// Consecutive failed attempts before the feed is declared dead.
    pub max_reconnects: u32,
    /// How long the warm-up read may take before seeding proceeds anyway.
    pub warm_up: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BRIDGE_WS_URL.to_string(),
            reconnect_delay: Duration::from_secs(2),
            max_reconnects: 5,
            warm_up: Duration::from_secs(10),
        }
    }
}

impl BridgeConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_max_reconnects(mut self, attempts: u32) -> Self {
        self.max_reconnects = attempts;
        self
    }

    pub fn with_warm_up(mut self, window: Duration) -> Self {
        self.warm_up = window;
        self
    }
}

/// Connection status updates for the footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Reconnecting,
    Disconnected,
    /// Reconnect budget exhausted; the loop must shut down.
    Failed,
}

impl ConnectionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "CONNECTING",
            ConnectionStatus::Connected => "CONNECTED",
            ConnectionStatus::Reconnecting => "RECONNECTING",
            ConnectionStatus::Disconnected => "DISCONNECTED",
            ConnectionStatus::Failed => "FEED FAILED",
        }
    }
}

/// Resolve the option chain over a short-lived dedicated connection.
pub async fn fetch_chain(url: &str, underlying: &str) -> Result<OptionChain, MonitorError> {
    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(|e| MonitorError::Connect(e.to_string()))?;
    let (mut write, mut read) = ws_stream.split();

    send_request(
        &mut write,
        &BridgeRequest::Chain {
            underlying: underlying.to_string(),
        },
    )
    .await?;

    let chain = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(msg) = read.next().await {
            match msg? {
                Message::Text(text) => match serde_json::from_str::<BridgeMessage>(&text) {
                    Ok(BridgeMessage::Chain {
                        underlying,
                        strikes,
                        expirations,
                    }) => {
                        return Ok(OptionChain {
                            underlying,
                            strikes,
                            expirations,
                        });
                    }
                    Ok(_) => {}
                    Err(e) => debug!("ignoring unparseable bridge message: {e}"),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
        Err(MonitorError::Chain {
            symbol: underlying.to_string(),
            reason: "bridge closed before answering".into(),
        })
    })
    .await
    .map_err(|_| MonitorError::Chain {
        symbol: underlying.to_string(),
        reason: "timed out waiting for chain".into(),
    })??;

    let _ = write.send(Message::Close(None)).await;
    Ok(chain)
}

/// Handle to the running feed task.
pub struct FeedHandle {
    status_rx: watch::Receiver<ConnectionStatus>,
    command_tx: mpsc::Sender<FeedCommand>,
    task: tokio::task::JoinHandle<()>,
}

enum FeedCommand {
    Shutdown,
}

impl FeedHandle {
    pub fn status(&self) -> ConnectionStatus {
        *self.status_rx.borrow()
    }

    /// Unsubscribe every tracked contract and the underlying, release the
    /// connection, and wait for the task to finish. Safe to call whatever
    /// state the connection is in.
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(FeedCommand::Shutdown).await;
        let _ = self.task.await;
    }
}

/// Spawn the feed task: connect, subscribe the universe, and keep the store
/// current until shutdown or the reconnect budget runs out.
pub fn spawn(
    config: BridgeConfig,
    universe: &Universe,
    store: Arc<Mutex<SnapshotStore>>,
) -> FeedHandle {
    let contracts: Vec<ContractSpec> = universe.instruments.iter().map(ContractSpec::from).collect();
    let underlying = universe.underlying.clone();
    let (status_tx, status_rx) = watch::channel(ConnectionStatus::Connecting);
    let (command_tx, command_rx) = mpsc::channel(4);

    let task = tokio::spawn(run_bridge_loop(
        config, underlying, contracts, store, status_tx, command_rx,
    ));

    FeedHandle {
        status_rx,
        command_tx,
        task,
    }
}

async fn run_bridge_loop(
    config: BridgeConfig,
    underlying: String,
    contracts: Vec<ContractSpec>,
    store: Arc<Mutex<SnapshotStore>>,
    status_tx: watch::Sender<ConnectionStatus>,
    mut command_rx: mpsc::Receiver<FeedCommand>,
) {
    info!("starting bridge client for {}", config.url);
    let mut attempts = 0u32;

    loop {
        match connect_async(&config.url).await {
            Ok((ws_stream, _)) => {
                info!("connected to bridge at {}", config.url);
                attempts = 0;
                let _ = status_tx.send(ConnectionStatus::Connected);

                let (mut write, mut read) = ws_stream.split();

                // (Re)subscribe the whole universe on every connect
                let subscribe = BridgeRequest::Subscribe {
                    underlying: underlying.clone(),
                    contracts: contracts.clone(),
                };
                if let Err(e) = send_request(&mut write, &subscribe).await {
                    error!("failed to subscribe: {e}");
                }

                loop {
                    tokio::select! {
                        msg = read.next() => match msg {
                            Some(Ok(Message::Text(text))) => {
                                match serde_json::from_str::<BridgeMessage>(&text) {
                                    Ok(message) => store.lock().await.apply(&message),
                                    Err(e) => debug!("unparseable bridge message: {e}"),
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                warn!("bridge closed connection");
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                error!("bridge error: {e}");
                                break;
                            }
                        },
                        _ = command_rx.recv() => {
                            // Shutdown request (or handle dropped): best-effort
                            // unsubscribe, then release the connection
                            let unsubscribe = BridgeRequest::Unsubscribe {
                                underlying: underlying.clone(),
                                contracts: contracts.clone(),
                            };
                            if let Err(e) = send_request(&mut write, &unsubscribe).await {
                                warn!("unsubscribe failed during shutdown: {e}");
                            }
                            let _ = write.send(Message::Close(None)).await;
                            let _ = status_tx.send(ConnectionStatus::Disconnected);
                            info!("unsubscribed {} contracts, bridge connection released", contracts.len());
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                error!("failed to connect to bridge at {}: {e}", config.url);
            }
        }

        attempts += 1;
        if attempts > config.max_reconnects {
            error!(
                "bridge unreachable after {} attempts, giving up",
                config.max_reconnects
            );
            let _ = status_tx.send(ConnectionStatus::Failed);
            return;
        }

        let _ = status_tx.send(ConnectionStatus::Reconnecting);
        debug!("waiting {:?} before reconnecting", config.reconnect_delay);
        tokio::select! {
            _ = tokio::time::sleep(config.reconnect_delay) => {}
            _ = command_rx.recv() => {
                let _ = status_tx.send(ConnectionStatus::Disconnected);
                return;
            }
        }
    }
}

/// Block until every subscribed instrument has reported at least once, or
/// the warm-up window elapses. Open interest publishes slowly after a
/// subscription, so seeding waits for it here.
pub async fn warm_up(store: &Arc<Mutex<SnapshotStore>>, window: Duration) -> (usize, usize) {
    let started = tokio::time::Instant::now();
    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let (seen, total) = store.lock().await.coverage();
        if seen == total || started.elapsed() >= window {
            return (seen, total);
        }
    }
}

async fn send_request<S>(write: &mut S, request: &BridgeRequest) -> Result<(), MonitorError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let raw = serde_json::to_string(request).map_err(|e| MonitorError::Protocol(e.to_string()))?;
    write
        .send(Message::Text(raw.into()))
        .await
        .map_err(MonitorError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = BridgeConfig::new("ws://localhost:9999/ws")
            .with_reconnect_delay(Duration::from_secs(5))
            .with_max_reconnects(2)
            .with_warm_up(Duration::from_secs(3));

        assert_eq!(config.url, "ws://localhost:9999/ws");
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.max_reconnects, 2);
        assert_eq!(config.warm_up, Duration::from_secs(3));
    }

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.url, DEFAULT_BRIDGE_WS_URL);
        assert_eq!(config.reconnect_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(ConnectionStatus::Connected.label(), "CONNECTED");
        assert_eq!(ConnectionStatus::Failed.label(), "FEED FAILED");
    }
}
