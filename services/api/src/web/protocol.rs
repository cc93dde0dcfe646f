//! services/api/src/web/protocol.rs
//!
//! Defines the wire types shared by the REST handlers and the `/events`
//! WebSocket, plus the WebSocket message protocol itself.

use nayra_core::domain::{Credential, HistoryItem, Screen, User};
use nayra_core::events::StoreEvent;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

//=========================================================================================
// Views of Domain State
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct UserView {
    pub name: String,
    pub email: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            email: user.email,
        }
    }
}

/// The credential as clients see it. The key itself never leaves the server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct CredentialView {
    pub has_key: bool,
    /// `null` while unchecked.
    pub is_valid: Option<bool>,
}

impl From<&Credential> for CredentialView {
    fn from(credential: &Credential) -> Self {
        Self {
            has_key: credential.api_key.is_some(),
            is_valid: credential.is_valid,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct HistoryItemView {
    pub id: String,
    /// One of `Generated`, `Edited` or `Combined`.
    #[serde(rename = "type")]
    pub kind: String,
    pub image: String,
    pub prompt: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl From<HistoryItem> for HistoryItemView {
    fn from(item: HistoryItem) -> Self {
        Self {
            id: item.id,
            kind: item.kind.to_string(),
            image: item.image,
            prompt: item.prompt,
            timestamp: item.timestamp,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScreenView {
    Loading,
    SignUp,
    KeySetup,
    Workspace,
}

impl From<Screen> for ScreenView {
    fn from(screen: Screen) -> Self {
        match screen {
            Screen::Loading => ScreenView::Loading,
            Screen::SignUp => ScreenView::SignUp,
            Screen::KeySetup => ScreenView::KeySetup,
            Screen::Workspace => ScreenView::Workspace,
        }
    }
}

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Asks for the current screen, answered with `ServerMessage::Screen`.
    GetScreen,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The signed-up user changed (login or logout).
    SessionChanged { user: Option<UserView> },

    /// The API key was set, cleared or restored.
    CredentialChanged {
        has_key: bool,
        is_valid: Option<bool>,
    },

    /// The history list changed; clients refetch `GET /history`.
    HistoryChanged { len: usize },

    /// The screen the UI should show now.
    Screen { screen: ScreenView },

    /// Reports a problem with a client message.
    Error { message: String },
}

impl From<StoreEvent> for ServerMessage {
    fn from(event: StoreEvent) -> Self {
        match event {
            StoreEvent::SessionChanged { user } => ServerMessage::SessionChanged {
                user: user.map(UserView::from),
            },
            StoreEvent::CredentialChanged { has_key, is_valid } => {
                ServerMessage::CredentialChanged { has_key, is_valid }
            }
            StoreEvent::HistoryChanged { len } => ServerMessage::HistoryChanged { len },
        }
    }
}
