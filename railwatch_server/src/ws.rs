//! WebSocket push channel.
//!
//! Each socket is one observer. Its queue opens with the connect snapshot,
//! then carries every published event as a JSON text frame. Client frames
//! are ignored apart from close.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use railwatch_core::{RailEngine, Subscription};
use railwatch_env::TokioContext;
use tracing::{debug, info, warn};

use crate::routes::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    upgrade(ws, state)
}

pub(crate) fn upgrade(ws: WebSocketUpgrade, state: AppState) -> Response {
    ws.on_upgrade(move |socket| observe(socket, state.engine))
}

async fn observe(mut socket: WebSocket, engine: RailEngine<TokioContext>) {
    let Subscription { id, mut receiver } = engine.connect();
    info!("Client connected: {} ({} observers)", id, engine.observer_count());
    
    loop {
        tokio::select! {
            queued = receiver.recv() => {
                // Hub dropped us
                let Some(message) = queued else { break };
                
                let text = match message.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to encode push message for {}: {}", id, e);
                        continue;
                    }
                };
                if let Err(e) = socket.send(Message::Text(text)).await {
                    debug!("Send to {} failed: {}", id, e);
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }
    
    engine.disconnect(id);
    info!("Client disconnected: {} ({} observers)", id, engine.observer_count());
}
