//! The per-connection session handler: one Tokio task per attached WebSocket,
//! bridging `ClientMessage`/`ServerMessage` JSON frames to the mutation engine
//! through the retry driver, and to every other connection through the shared
//! broadcast channel.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{FutureExt, SinkExt, StreamExt};
use tokio::sync::broadcast;

use strandline_core::{engine, with_retry, EngineError};

use crate::config::AppState;
use crate::error::SessionError;

mod messages;

pub use messages::{ClientMessage, Operation, ServerMessage};

pub async fn upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_session(socket, state))
}

async fn run_session(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();

    let snapshot = match crate::snapshot::current_nodes(&state.storage).await {
        Ok(nodes) => nodes,
        Err(err) => {
            tracing::error!(error = %err, "failed to load snapshot for new connection");
            return;
        }
    };
    if send(&mut sink, &ServerMessage::Nodes { nodes: snapshot }).await.is_err() {
        return;
    }

    let mut broadcasts = state.broadcast.subscribe();

    loop {
        tokio::select! {
            incoming = stream.next() => {
                let Some(incoming) = incoming else { break };
                let Ok(incoming) = incoming else { break };
                let Message::Text(text) = incoming else { continue };

                match json::from_str::<ClientMessage>(&text) {
                    Ok(message) => handle_client_message(&state, &mut sink, message).await,
                    Err(err) => {
                        tracing::warn!(error = %err, "dropping malformed client message");
                    }
                }
            }
            broadcast = broadcasts.recv() => {
                match broadcast {
                    Ok(message) => {
                        if send(&mut sink, &message).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "connection lagged behind broadcast, resending snapshot");
                        match crate::snapshot::current_nodes(&state.storage).await {
                            Ok(nodes) => {
                                if send(&mut sink, &ServerMessage::Nodes { nodes }).await.is_err() {
                                    break;
                                }
                            }
                            Err(err) => {
                                tracing::error!(error = %err, "failed to resynchronize lagged connection");
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

async fn handle_client_message(
    state: &Arc<AppState>,
    sink: &mut (impl futures::Sink<Message> + Unpin),
    message: ClientMessage,
) {
    match message {
        ClientMessage::AddNode { prev } => {
            let result = with_retry(&state.storage, state.max_retry_attempts, move |adapter, session| {
                engine::insert_after(adapter, session, prev).boxed()
            })
            .await;

            match result {
                Ok(outcome) => {
                    let _ = state.broadcast.send(ServerMessage::NodeAdded {
                        created_node: outcome.created_node,
                        updated_nodes: outcome.updated_nodes,
                    });
                }
                Err(err) => {
                    let _ = send(
                        sink,
                        &ServerMessage::Error {
                            message: describe(err),
                            operation: Operation::AddNode,
                        },
                    )
                    .await;
                }
            }
        }
        ClientMessage::RemoveNode { node_id } => {
            let result = with_retry(&state.storage, state.max_retry_attempts, move |adapter, session| {
                engine::delete(adapter, session, node_id).boxed()
            })
            .await;

            match result {
                Ok(outcome) => {
                    let _ = state.broadcast.send(ServerMessage::NodeRemoved {
                        deleted_node_id: outcome.deleted_node_id,
                        updated_nodes: outcome.updated_nodes,
                    });
                }
                Err(err) => {
                    let _ = send(
                        sink,
                        &ServerMessage::Error {
                            message: describe(err),
                            operation: Operation::RemoveNode,
                        },
                    )
                    .await;
                }
            }
        }
    }
}

fn describe(err: EngineError<strandline_store::StoreError>) -> String {
    SessionError::from(err).to_string()
}

async fn send(
    sink: &mut (impl futures::Sink<Message> + Unpin),
    message: &ServerMessage,
) -> Result<(), ()> {
    let text = json::to_string(message).expect("ServerMessage always serializes");
    sink.send(Message::Text(text)).await.map_err(|_| ())
}
