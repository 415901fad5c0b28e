use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A single chat message between a customer and the admin channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(deserialize_with = "party_id")]
    pub sender: String,
    #[serde(deserialize_with = "party_id")]
    pub recipient: String,
    /// Room key: the customer's id. Older payloads omit it.
    #[serde(default, alias = "roomId")]
    pub room: String,
    #[serde(alias = "message", alias = "content")]
    pub text: String,
    #[serde(default, alias = "isRead")]
    pub read: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// True when `user_id` sent or receives this message.
    pub fn involves(&self, user_id: &str) -> bool {
        self.sender == user_id || self.recipient == user_id
    }
}

/// Either a bare id or a populated `{ "_id": ..., ... }` object.
#[derive(Deserialize)]
#[serde(untagged)]
enum PartyRef {
    Id(String),
    Object {
        #[serde(alias = "_id")]
        id: String,
    },
}

fn party_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match PartyRef::deserialize(deserializer)? {
        PartyRef::Id(id) => id,
        PartyRef::Object { id } => id,
    })
}

/// The customer side of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatUser {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// One entry of the admin inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub user: ChatUser,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub unread_count: u32,
}

impl Conversation {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

/// Frames sent to the live channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinRoom {
        room: String,
    },
    LeaveRoom {
        room: String,
    },
    SendMessage {
        room: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        recipient: Option<String>,
        text: String,
    },
    Ping,
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::JoinRoom { .. } => "join_room",
            ClientEvent::LeaveRoom { .. } => "leave_room",
            ClientEvent::SendMessage { .. } => "send_message",
            ClientEvent::Ping => "ping",
        }
    }
}

/// Frames pushed by the live channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    ReceiveMessage(ChatMessage),
    MessagesRead { room: String, reader: String },
    Error { message: String },
    Pong,
}
