use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{ChangeData, CollabError, DocumentChange};

/// Message types a client may send. Anything else is ignored.
pub const CLIENT_MESSAGE_TYPES: [&str; 7] = [
    "auth",
    "join",
    "leave",
    "change",
    "cursor-move",
    "chat-message",
    "ping",
];

/// Message types accepted before the connection has authenticated.
pub const PUBLIC_MESSAGE_TYPES: [&str; 2] = ["auth", "ping"];

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthMessage {
    pub user_id: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinMessage {
    pub book_id: i32,
    pub chapter_id: Option<i32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaveMessage {
    pub book_id: Option<i32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeMessage {
    pub book_id: Option<i32>,
    pub chapter_id: Option<i32>,
    pub data: ChangeData,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CursorData {
    pub position: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CursorMoveMessage {
    pub book_id: Option<i32>,
    pub data: CursorData,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatData {
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub book_id: Option<i32>,
    pub data: ChatData,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PingMessage {}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "auth")]
    Auth(AuthMessage),
    #[serde(rename = "join")]
    Join(JoinMessage),
    #[serde(rename = "leave")]
    Leave(LeaveMessage),
    #[serde(rename = "change")]
    Change(ChangeMessage),
    #[serde(rename = "cursor-move")]
    CursorMove(CursorMoveMessage),
    #[serde(rename = "chat-message")]
    ChatMessage(ChatMessage),
    #[serde(rename = "ping")]
    Ping(PingMessage),
}

impl ClientMessage {
    /// Parse one text frame.
    ///
    /// Frames that are not JSON, carry no `type`, or carry a type this server
    /// does not know are logged and yield `Ok(None)`. A known type with a
    /// malformed body is an error the sender should hear about.
    pub fn parse(text: &str) -> Result<Option<Self>, CollabError> {
        Self::parse_for(text, true)
    }

    /// Like [`ClientMessage::parse`], but on an unauthenticated connection a
    /// type outside [`PUBLIC_MESSAGE_TYPES`] is refused before its body is
    /// looked at.
    pub fn parse_for(text: &str, authenticated: bool) -> Result<Option<Self>, CollabError> {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                warn!("Ignoring non-JSON frame: {}", e);
                return Ok(None);
            }
        };

        let msg_type = match value.get("type").and_then(Value::as_str) {
            Some(t) => t,
            None => {
                warn!("Ignoring frame without a message type");
                return Ok(None);
            }
        };

        if !CLIENT_MESSAGE_TYPES.contains(&msg_type) {
            debug!("Ignoring unknown message type '{}'", msg_type);
            return Ok(None);
        }

        if !authenticated && !PUBLIC_MESSAGE_TYPES.contains(&msg_type) {
            return Err(CollabError::AuthenticationRequired);
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| CollabError::InvalidMessage(e.to_string()))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ClientMessage::Auth(_) => "auth",
            ClientMessage::Join(_) => "join",
            ClientMessage::Leave(_) => "leave",
            ClientMessage::Change(_) => "change",
            ClientMessage::CursorMove(_) => "cursor-move",
            ClientMessage::ChatMessage(_) => "chat-message",
            ClientMessage::Ping(_) => "ping",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthSuccessEvent {
    pub user_id: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfoEvent {
    pub book_id: i32,
    pub chapter_id: Option<i32>,
    /// Other users connected to the session
    pub users: Vec<i32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecentChangesEvent {
    pub book_id: i32,
    pub changes: Vec<DocumentChange>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEvent {
    pub user_id: i32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub user_id: i32,
    pub data: DocumentChange,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CursorMoveEvent {
    pub user_id: i32,
    pub position: Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageEvent {
    pub user_id: i32,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorEvent {
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PongEvent {
    pub timestamp: DateTime<Utc>,
}

/// Events the server pushes to a connection
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "auth-success")]
    AuthSuccess(AuthSuccessEvent),
    #[serde(rename = "session-info")]
    SessionInfo(SessionInfoEvent),
    #[serde(rename = "recent-changes")]
    RecentChanges(RecentChangesEvent),
    #[serde(rename = "user-joined")]
    UserJoined(PresenceEvent),
    #[serde(rename = "user-left")]
    UserLeft(PresenceEvent),
    #[serde(rename = "change")]
    Change(ChangeEvent),
    #[serde(rename = "cursor-move")]
    CursorMove(CursorMoveEvent),
    #[serde(rename = "chat-message")]
    ChatMessage(ChatMessageEvent),
    #[serde(rename = "error")]
    Error(ErrorEvent),
    #[serde(rename = "pong")]
    Pong(PongEvent),
}

impl ServerEvent {
    pub fn error(err: &CollabError) -> Self {
        ServerEvent::Error(ErrorEvent { message: err.to_string() })
    }

    pub fn user_joined(user_id: i32) -> Self {
        ServerEvent::UserJoined(PresenceEvent { user_id, timestamp: Utc::now() })
    }

    pub fn user_left(user_id: i32) -> Self {
        ServerEvent::UserLeft(PresenceEvent { user_id, timestamp: Utc::now() })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ServerEvent::AuthSuccess(_) => "auth-success",
            ServerEvent::SessionInfo(_) => "session-info",
            ServerEvent::RecentChanges(_) => "recent-changes",
            ServerEvent::UserJoined(_) => "user-joined",
            ServerEvent::UserLeft(_) => "user-left",
            ServerEvent::Change(_) => "change",
            ServerEvent::CursorMove(_) => "cursor-move",
            ServerEvent::ChatMessage(_) => "chat-message",
            ServerEvent::Error(_) => "error",
            ServerEvent::Pong(_) => "pong",
        }
    }
}
