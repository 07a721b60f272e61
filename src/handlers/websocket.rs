use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use warp::ws::{Message, WebSocket};

use crate::core::connection::Connection;
use crate::core::message_handler::MessageHandler;
use crate::core::message_types::ServerEvent;

// Handle a WebSocket connection for its whole lifetime
pub async fn handle_ws_client(ws: WebSocket, handler: MessageHandler) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    // Spawn a task to forward events from our channel to the WebSocket
    let forwarder = tokio::task::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize outbound event: {}", e);
                    continue;
                }
            };
            if let Err(e) = ws_tx.send(Message::text(text)).await {
                debug!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let connection = Connection::new(tx);
    let client_id = connection.id.clone();
    let mut session = handler.server().open_session(connection);
    info!("Client connected: {}", client_id);

    // Frames are handled one at a time, which serializes this session's operations
    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(msg) if msg.is_close() => break,
            Ok(msg) => {
                // Only process text messages
                if let Ok(text) = msg.to_str() {
                    handler.handle_frame(&mut session, text).await;
                }
            }
            Err(e) => {
                warn!("WebSocket error for {}: {}", client_id, e);
                break;
            }
        }
    }

    handler.disconnect(&mut session).await;
    info!(
        "Client disconnected: {} after {:?}",
        client_id,
        session.connection().connection_duration()
    );

    // Dropping the last sender lets the forwarder drain and exit
    drop(session);
    if let Err(e) = forwarder.await {
        error!("Forwarder task for {} failed: {}", client_id, e);
    }
}
