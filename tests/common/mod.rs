//! Shared utilities for integration testing: a scripted OneBot gateway.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

/// Instructions for the currently connected session.
pub enum ServerCommand {
    /// Push a text frame to the client.
    Frame(String),
    /// Drop the TCP connection without a close handshake.
    Drop,
}

/// How the mock gateway answers actions.
#[derive(Clone, Copy)]
pub enum Reply {
    /// Respond with this retcode (`0` means success).
    Retcode(i64),
    /// Record the action and never respond.
    Silent,
}

/// Handle to a running mock gateway.
pub struct MockGateway {
    pub addr: SocketAddr,
    /// Every action frame received from clients.
    pub actions: mpsc::UnboundedReceiver<Value>,
    /// Query string of each accepted handshake.
    pub queries: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
    commands: mpsc::UnboundedSender<ServerCommand>,
}

impl MockGateway {
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn push(&self, frame: Value) {
        let _ = self.commands.send(ServerCommand::Frame(frame.to_string()));
    }

    pub fn drop_connection(&self) {
        let _ = self.commands.send(ServerCommand::Drop);
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Poll until `count` handshakes were accepted.
    pub async fn wait_for_connections(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.connections() < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("client did not connect in time");
    }

    pub async fn next_action(&mut self) -> Value {
        tokio::time::timeout(Duration::from_secs(5), self.actions.recv())
            .await
            .expect("no action received in time")
            .expect("mock gateway stopped")
    }
}

/// A group invite event frame.
pub fn invite_frame(flag: &str, user_id: i64, group_id: i64) -> Value {
    json!({
        "time": 1_700_000_000,
        "self_id": 10001,
        "post_type": "request",
        "request_type": "group",
        "sub_type": "invite",
        "group_id": group_id,
        "user_id": user_id,
        "comment": "",
        "flag": flag,
    })
}

/// Start a mock gateway that answers every action with `retcode`
/// (`0` means success).
pub async fn start_mock_gateway(retcode: i64) -> MockGateway {
    start_scripted_gateway(Reply::Retcode(retcode)).await
}

/// Start a mock gateway with the given reply behaviour.
pub async fn start_scripted_gateway(reply: Reply) -> MockGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (action_tx, action_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let commands = Arc::new(AsyncMutex::new(command_rx));
    let queries = Arc::new(Mutex::new(Vec::new()));
    let connections = Arc::new(AtomicUsize::new(0));

    let handle = MockGateway {
        addr,
        actions: action_rx,
        queries: Arc::clone(&queries),
        connections: Arc::clone(&connections),
        commands: command_tx,
    };

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let queries = Arc::clone(&queries);
            let callback = move |request: &Request, response: Response| {
                let query = request.uri().query().unwrap_or_default().to_string();
                queries.lock().unwrap().push(query);
                Ok::<_, ErrorResponse>(response)
            };

            let Ok(ws) = accept_hdr_async(stream, callback).await else {
                continue;
            };
            connections.fetch_add(1, Ordering::SeqCst);

            let action_tx = action_tx.clone();
            let commands = Arc::clone(&commands);
            tokio::spawn(async move {
                let mut commands = commands.lock().await;
                let (mut writer, mut reader) = ws.split();

                loop {
                    tokio::select! {
                        command = commands.recv() => match command {
                            Some(ServerCommand::Frame(text)) => {
                                if writer.send(Message::Text(text.into())).await.is_err() {
                                    break;
                                }
                            }
                            Some(ServerCommand::Drop) | None => break,
                        },
                        message = reader.next() => match message {
                            Some(Ok(Message::Text(text))) => {
                                let action: Value = serde_json::from_str(&text).unwrap();
                                let echo = action["echo"].clone();
                                let _ = action_tx.send(action);
                                let Reply::Retcode(retcode) = reply else {
                                    continue;
                                };
                                let response = json!({
                                    "status": if retcode == 0 { "ok" } else { "failed" },
                                    "retcode": retcode,
                                    "data": null,
                                    "message": if retcode == 0 { "" } else { "request rejected" },
                                    "echo": echo,
                                });
                                if writer.send(Message::Text(response.to_string().into())).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(_)) => {}
                            Some(Err(_)) | None => break,
                        },
                    }
                }
            });
        }
    });

    handle
}

/// Accept TCP connections but never answer the websocket handshake.
pub async fn start_stalled_listener() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    addr
}
