//! services/api/src/web/ws_handler.rs
//!
//! The `/events` WebSocket. Every store change is pushed to the client as a
//! `ServerMessage`, followed by the screen that change implies.

use crate::error::ApiError;
use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{
    stream::{self, SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

type WsSender = SplitSink<WebSocket, Message>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New events connection established");
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the first screen is sent so no change slips in between.
    let mut events = stream::select_all([
        app_state.app.session.subscribe(),
        app_state.app.credential.subscribe(),
        app_state.app.history.subscribe(),
    ]);

    if let Err(e) = send_screen(&mut sender, &app_state).await {
        warn!("Failed to send the initial screen: {}", e);
        return;
    }

    loop {
        let result = tokio::select! {
            _ = app_state.shutdown.cancelled() => {
                debug!("Server shutting down, closing events connection");
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
            event = events.next() => match event {
                Some(event) => forward_event(&mut sender, &app_state, ServerMessage::from(event)).await,
                // Every store was disposed.
                None => break,
            },
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => handle_text_message(text.as_str(), &mut sender, &app_state).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => Ok(()),
                Some(Err(e)) => Err(ApiError::Websocket(e)),
            },
        };

        if let Err(e) = result {
            warn!("Events connection failed: {}", e);
            break;
        }
    }

    info!("Events connection closed");
}

async fn handle_text_message(
    text: &str,
    sender: &mut WsSender,
    app_state: &AppState,
) -> Result<(), ApiError> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::GetScreen) => send_screen(sender, app_state).await,
        Err(e) => {
            let message = ServerMessage::Error {
                message: format!("Unrecognized message: {}", e),
            };
            send_message(sender, &message).await
        }
    }
}

async fn forward_event(
    sender: &mut WsSender,
    app_state: &AppState,
    message: ServerMessage,
) -> Result<(), ApiError> {
    send_message(sender, &message).await?;
    send_screen(sender, app_state).await
}

async fn send_screen(sender: &mut WsSender, app_state: &AppState) -> Result<(), ApiError> {
    let screen = app_state.app.screen().await.into();
    send_message(sender, &ServerMessage::Screen { screen }).await
}

async fn send_message(sender: &mut WsSender, message: &ServerMessage) -> Result<(), ApiError> {
    let json = serde_json::to_string(message).map_err(|e| ApiError::Internal(e.to_string()))?;
    sender.send(Message::Text(json.into())).await?;
    Ok(())
}
