//! WebSocket notification server
//!
//! Listens on the /ws upgrade endpoint and runs one session task per
//! accepted connection. A session starts unbound, registers itself with the
//! connection registry once the client sends its bind frame, forwards
//! dispatched payloads out over the transport, and unregisters on close.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use super::protocol::ClientFrame;
use crate::notify::{ConnectionHandle, ConnectionRegistry};

/// Configuration for the WebSocket server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind: String,
    /// Port to listen on
    pub port: u16,
    /// Deadline for the bind handshake; unbound connections past it are closed
    pub bind_timeout: Option<Duration>,
}

impl ServerConfig {
    /// Create a new server configuration with no bind deadline
    pub fn new(bind: String, port: u16) -> Self {
        Self {
            bind,
            port,
            bind_timeout: None,
        }
    }

    /// Set the bind handshake deadline
    pub fn with_bind_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.bind_timeout = timeout;
        self
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// WebSocket server for handling notification client connections
pub struct NotifyServer {
    config: ServerConfig,
    registry: Arc<ConnectionRegistry>,
    shutdown_tx: broadcast::Sender<()>,
}

impl NotifyServer {
    /// Create a new server over a shared connection registry
    pub fn new(config: ServerConfig, registry: Arc<ConnectionRegistry>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            registry,
            shutdown_tx,
        }
    }

    /// Get the shared connection registry
    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.registry)
    }

    /// Trigger server shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Run the WebSocket server
    ///
    /// Listens for incoming connections and handles them concurrently until
    /// a shutdown signal arrives. On shutdown every open session receives
    /// the signal and runs its close-path cleanup.
    pub async fn run(&self) -> anyhow::Result<()> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(&addr).await?;
        info!("Notification server listening on ws://{}/ws", addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                // Accept new connections
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let registry = Arc::clone(&self.registry);
                            let shutdown_rx = self.shutdown_tx.subscribe();
                            let bind_timeout = self.config.bind_timeout;
                            let peer = peer_addr.to_string();

                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, peer.clone(), registry, bind_timeout, shutdown_rx).await {
                                    error!("Connection error from {}: {}", peer, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }
                // Handle shutdown signal
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        let remaining = self.registry.connection_count().await;
        if remaining > 0 {
            info!("Waiting for {} bound connections to close...", remaining);
        }

        Ok(())
    }
}

/// Handle a single WebSocket connection
///
/// Session lifecycle: Unbound until a valid bind frame arrives, Bound (and
/// registered) afterwards, Closed when the transport goes away for any
/// reason. Generic over the stream so tests can run sessions over an
/// in-process duplex pipe.
async fn handle_connection<S>(
    stream: S,
    peer: String,
    registry: Arc<ConnectionRegistry>,
    bind_timeout: Option<Duration>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    info!("New connection from {}", peer);

    // Upgrade to WebSocket
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // The registry hands clones of this handle to the dispatcher; payloads
    // queued on it are drained by the outbound arm below
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let handle = ConnectionHandle::new(outbound_tx);
    let mut bound_user: Option<String> = None;

    // The deadline arm is disarmed once bound (or when no timeout is set),
    // so the fallback duration is never observed
    let bind_deadline =
        tokio::time::sleep(bind_timeout.unwrap_or(Duration::from_secs(3600)));
    tokio::pin!(bind_deadline);

    // Session loop
    loop {
        tokio::select! {
            // Receive frames from the client
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(&text, &mut bound_user, &handle, &registry, &peer).await;
                    }
                    Some(Ok(Message::Binary(data))) => {
                        warn!("Received binary frame from {} ({} bytes), ignoring", peer, data.len());
                    }
                    Some(Ok(Message::Ping(data))) => {
                        // A failed write is a dead transport; take the close
                        // path so registry cleanup still runs
                        if let Err(e) = ws_sender.send(Message::Pong(data)).await {
                            error!("Write to {} failed: {}", peer, e);
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        // Ignore pong messages
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Client {} requested close", peer);
                        break;
                    }
                    Some(Ok(Message::Frame(_))) => {
                        // Raw frame, ignore
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error from {}: {}", peer, e);
                        break;
                    }
                    None => {
                        info!("Connection closed by {}", peer);
                        break;
                    }
                }
            }
            // Forward dispatched payloads to the client
            Some(payload) = outbound_rx.recv() => {
                if let Err(e) = ws_sender.send(Message::Text(payload)).await {
                    error!("Write to {} failed: {}", peer, e);
                    break;
                }
            }
            // Close connections that never complete the bind handshake
            _ = &mut bind_deadline, if bind_timeout.is_some() && bound_user.is_none() => {
                info!("Closing {}: no bind frame within the deadline", peer);
                let _ = ws_sender.send(Message::Close(None)).await;
                break;
            }
            // Handle shutdown signal
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received, closing connection to {}", peer);
                let _ = ws_sender.send(Message::Close(None)).await;
                break;
            }
        }
    }

    // Close-path cleanup: only bound sessions ever touched the registry
    if let Some(user_id) = bound_user {
        registry.unregister(&user_id, handle.id()).await;
    }

    let lifetime = handle.opened_at().elapsed().unwrap_or_default();
    info!("Connection from {} closed after {:?}", peer, lifetime);
    Ok(())
}

/// Process one inbound text frame against the session state machine
///
/// Only a bind frame on an unbound session has any effect. Malformed
/// frames, unrecognized frames, and rebind attempts are discarded without
/// closing the connection.
async fn handle_frame(
    text: &str,
    bound_user: &mut Option<String>,
    handle: &ConnectionHandle,
    registry: &ConnectionRegistry,
    peer: &str,
) {
    match ClientFrame::parse(text) {
        Ok(ClientFrame::Auth { user_id, role }) => {
            if let Some(existing) = bound_user.as_deref() {
                // Identity is immutable once bound
                debug!(
                    "Ignoring rebind attempt from {} (already bound as {})",
                    peer, existing
                );
                return;
            }
            registry
                .register(user_id.as_str(), handle.clone().with_role(role))
                .await;
            info!("Connection {} from {} bound to user {}", handle.id(), peer, user_id);
            *bound_user = Some(user_id);
        }
        Ok(ClientFrame::Unrecognized) => {
            debug!("Ignoring unrecognized frame from {}", peer);
        }
        Err(e) => {
            debug!("Discarding malformed frame from {}: {}", peer, e);
        }
    }
}
