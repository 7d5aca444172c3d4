//! NapCat websocket client.
//!
//! # Responsibilities
//! - Open the websocket (access token as query parameter)
//! - Decode inbound frames into [`GatewayEvent`]s on one FIFO channel
//! - Correlate action responses with callers through `echo`
//! - Reconnect after unexpected closes (fixed delay, bounded attempts)
//! - Close on request and report it as `Disconnected`

use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;
use uuid::Uuid;

use crate::gateway::protocol::{self, ActionResponse, Frame};
use crate::gateway::types::{GatewayError, GatewayEvent, GatewayOptions, GatewayResult};
use crate::gateway::Gateway;
use crate::observability::metrics;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long a requested close waits for the peer's close frame.
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(1);

enum Command {
    Send { echo: String, frame: String },
    Close,
}

enum SessionEnd {
    Requested,
    Lost,
}

/// Halves that move into the connection task on `connect`.
struct Startup {
    events: mpsc::UnboundedSender<GatewayEvent>,
    commands: mpsc::UnboundedReceiver<Command>,
}

struct Inner {
    options: GatewayOptions,
    commands: mpsc::UnboundedSender<Command>,
    startup: Mutex<Option<Startup>>,
    pending: DashMap<String, oneshot::Sender<ActionResponse>>,
    connected: AtomicBool,
    closing: AtomicBool,
}

impl Inner {
    fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
        metrics::set_gateway_connected(connected);
    }

    /// Drop every waiting caller; their receivers observe the disconnect.
    fn fail_pending(&self) {
        let dropped = self.pending.len();
        self.pending.clear();
        if dropped > 0 {
            tracing::warn!(dropped, "Abandoned in-flight actions on disconnect");
        }
    }

    /// Fail the caller of a frame that will never reach the gateway.
    fn discard(&self, command: Command) {
        if let Command::Send { echo, .. } = command {
            if self.pending.remove(&echo).is_some() {
                tracing::debug!(echo = %echo, "Discarded action queued on a closed session");
            }
        }
    }
}

/// Client for a NapCat (OneBot v11) websocket endpoint.
///
/// Cloning is cheap; all clones drive the same connection.
#[derive(Clone)]
pub struct NapcatClient {
    inner: Arc<Inner>,
}

impl NapcatClient {
    /// Create a client and the receiver its events are delivered on.
    ///
    /// Nothing is opened until [`NapcatClient::connect`].
    pub fn new(options: GatewayOptions) -> (Self, mpsc::UnboundedReceiver<GatewayEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let inner = Inner {
            options,
            commands: command_tx,
            startup: Mutex::new(Some(Startup {
                events: event_tx,
                commands: command_rx,
            })),
            pending: DashMap::new(),
            connected: AtomicBool::new(false),
            closing: AtomicBool::new(false),
        };

        (
            Self {
                inner: Arc::new(inner),
            },
            event_rx,
        )
    }

    /// Open the connection and start the background connection task.
    ///
    /// Fails if the initial handshake fails; reconnection only applies to
    /// connections that were established once. A client connects once.
    pub async fn connect(&self) -> GatewayResult<()> {
        let mut startup = self.inner.startup.lock().await;
        let Some(Startup { events, commands }) = startup.take() else {
            return Err(GatewayError::AlreadyConnected);
        };

        let ws = match open(&self.inner.options).await {
            Ok(ws) => ws,
            Err(e) => {
                *startup = Some(Startup { events, commands });
                return Err(e);
            }
        };

        tracing::info!(url = %self.inner.options.base_url, "Gateway connected");
        self.inner.set_connected(true);
        let _ = events.send(GatewayEvent::Connected);

        let connection = Connection {
            inner: Arc::clone(&self.inner),
            events,
            commands,
        };
        tokio::spawn(connection.run(ws));

        Ok(())
    }

    /// Request the connection to close.
    ///
    /// Returns immediately; completion is reported as
    /// [`GatewayEvent::Disconnected`]. Also cancels a reconnection in progress.
    pub fn disconnect(&self) {
        self.inner.closing.store(true, Ordering::Release);
        let _ = self.inner.commands.send(Command::Close);
    }

    /// Whether a websocket session is currently open.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Send an action and wait for its response.
    ///
    /// A failed response is an error when `throw_on_error` is set and is
    /// logged and returned otherwise.
    pub async fn call(&self, action: &str, params: Value) -> GatewayResult<ActionResponse> {
        if !self.is_connected() {
            return Err(GatewayError::NotConnected);
        }

        let echo = Uuid::new_v4().to_string();
        let frame = protocol::encode_action(action, params, &echo)?;

        let (tx, rx) = oneshot::channel();
        self.inner.pending.insert(echo.clone(), tx);
        let command = Command::Send {
            echo: echo.clone(),
            frame,
        };
        if self.inner.commands.send(command).is_err() {
            self.inner.pending.remove(&echo);
            return Err(GatewayError::NotConnected);
        }

        let timeout = self.inner.options.action_timeout;
        let response = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(GatewayError::Disconnected(action.to_string())),
            Err(_) => {
                self.inner.pending.remove(&echo);
                return Err(GatewayError::Timeout {
                    action: action.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
        };

        if response.is_ok() {
            return Ok(response);
        }

        if self.inner.options.throw_on_error {
            return Err(GatewayError::ActionFailed {
                action: action.to_string(),
                retcode: response.retcode,
                message: response.reason().to_string(),
            });
        }

        tracing::warn!(
            action = %action,
            retcode = response.retcode,
            reason = %response.reason(),
            "Action failed"
        );
        Ok(response)
    }
}

impl Gateway for NapcatClient {
    fn disconnect(&self) {
        NapcatClient::disconnect(self);
    }

    async fn set_group_add_request(&self, flag: &str, approve: bool) -> GatewayResult<()> {
        self.call(
            protocol::SET_GROUP_ADD_REQUEST,
            protocol::group_add_request_params(flag, approve),
        )
        .await
        .map(|_| ())
    }
}

impl std::fmt::Debug for NapcatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NapcatClient")
            .field("base_url", &self.inner.options.base_url)
            .field("connected", &self.is_connected())
            .field("pending", &self.inner.pending.len())
            .finish()
    }
}

/// Build the endpoint URL, attaching the access token if one is set.
pub(crate) fn endpoint_url(options: &GatewayOptions) -> GatewayResult<Url> {
    let mut url = Url::parse(&options.base_url)
        .map_err(|_| GatewayError::InvalidUrl(options.base_url.clone()))?;
    if !options.access_token.is_empty() {
        url.query_pairs_mut()
            .append_pair("access_token", &options.access_token);
    }
    Ok(url)
}

async fn open(options: &GatewayOptions) -> GatewayResult<WsStream> {
    let url = endpoint_url(options)?;
    let (ws, _response) = connect_async(url.as_str()).await?;
    Ok(ws)
}

/// State owned by the background connection task.
struct Connection {
    inner: Arc<Inner>,
    events: mpsc::UnboundedSender<GatewayEvent>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl Connection {
    /// Drive sessions until a requested close or reconnection gives up.
    ///
    /// Dropping `self` at the end closes the event stream.
    async fn run(mut self, mut ws: WsStream) {
        loop {
            let end = self.session(&mut ws).await;

            self.inner.set_connected(false);
            self.inner.fail_pending();
            tracing::info!("Gateway disconnected");
            let _ = self.events.send(GatewayEvent::Disconnected);

            let requested = matches!(end, SessionEnd::Requested)
                || self.inner.closing.load(Ordering::Acquire);
            if requested || !self.inner.options.reconnection.enable {
                break;
            }

            match self.reconnect().await {
                Some(next) => {
                    ws = next;
                    self.inner.set_connected(true);
                    let _ = self.events.send(GatewayEvent::Connected);
                }
                None => break,
            }
        }

        self.commands.close();
        while let Ok(command) = self.commands.try_recv() {
            self.inner.discard(command);
        }
        tracing::debug!("Gateway connection task finished");
    }

    async fn session(&mut self, ws: &mut WsStream) -> SessionEnd {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Send { frame, .. }) => {
                        if let Err(e) = ws.send(Message::Text(frame.into())).await {
                            tracing::warn!(error = %e, "Failed to send frame");
                            return SessionEnd::Lost;
                        }
                    }
                    Some(Command::Close) | None => {
                        close(ws).await;
                        return SessionEnd::Requested;
                    }
                },
                message = ws.next() => match message {
                    Some(Ok(Message::Text(text))) => self.dispatch(&text),
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(frame = ?frame, "Gateway closed the connection");
                        return SessionEnd::Lost;
                    }
                    Some(Ok(_)) => {
                        // Ping/pong handled by tungstenite; binary unused by OneBot.
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Websocket error");
                        return SessionEnd::Lost;
                    }
                    None => return SessionEnd::Lost,
                },
            }
        }
    }

    fn dispatch(&self, text: &str) {
        let frame = match protocol::decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed frame");
                return;
            }
        };

        match frame {
            Frame::Response(response) => {
                let waiter = response
                    .echo
                    .as_deref()
                    .and_then(|echo| self.inner.pending.remove(echo));
                match waiter {
                    Some((_, tx)) => {
                        let _ = tx.send(response);
                    }
                    None => tracing::debug!(echo = ?response.echo, "Unmatched action response"),
                }
            }
            Frame::Event(event) => {
                let _ = self.events.send(event);
            }
            Frame::Meta { kind } => tracing::debug!(kind = %kind, "Gateway meta event"),
            Frame::Ignored { post_type } => tracing::trace!(post_type = %post_type, "Ignoring event"),
        }
    }

    /// Try to reopen the connection under the configured policy.
    ///
    /// Returns `None` when attempts run out or a close is requested.
    async fn reconnect(&mut self) -> Option<WsStream> {
        let attempts = self.inner.options.reconnection.attempts;
        let delay = Duration::from_millis(self.inner.options.reconnection.delay_ms);

        for attempt in 1..=attempts {
            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = &mut sleep => break,
                    command = self.commands.recv() => match command {
                        // Stale frame queued before the connection dropped.
                        Some(stale @ Command::Send { .. }) => {
                            self.inner.discard(stale);
                            continue;
                        }
                        Some(Command::Close) | None => {
                            tracing::info!("Reconnection cancelled");
                            return None;
                        }
                    },
                }
            }

            metrics::record_reconnect_attempt();
            tracing::info!(attempt, max_attempts = attempts, "Reconnecting to gateway");

            match open(&self.inner.options).await {
                Ok(mut ws) => {
                    if self.inner.closing.load(Ordering::Acquire) {
                        close(&mut ws).await;
                        return None;
                    }
                    tracing::info!(attempt, "Gateway reconnected");
                    return Some(ws);
                }
                Err(e) => {
                    tracing::warn!(attempt, max_attempts = attempts, error = %e, "Reconnection attempt failed");
                }
            }
        }

        tracing::error!(attempts, "Giving up on gateway reconnection");
        None
    }
}

/// Send a close frame and wait briefly for the peer to finish the handshake.
async fn close(ws: &mut WsStream) {
    if let Err(e) = ws.close(None).await {
        tracing::debug!(error = %e, "Close frame not sent");
        return;
    }

    let drain = async { while let Some(Ok(_)) = ws.next().await {} };
    let _ = tokio::time::timeout(CLOSE_HANDSHAKE_TIMEOUT, drain).await;
}
