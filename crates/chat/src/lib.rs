//! Live customer support chat
//!
//! An admin console reconciles a multi-conversation inbox against the events
//! pushed over a websocket live channel; customers use a single-room widget.
//! Rooms are keyed by the customer's id.

mod api;
mod console;
mod error;
mod inbox;
mod message;
mod socket;
mod widget;

pub use api::ChatApi;
pub use console::{ChatConsole, ChatSupervisor};
pub use error::ChatError;
pub use inbox::{Delivery, HistoryTicket, Inbox, InboxSnapshot};
pub use message::{ChatMessage, ChatUser, ClientEvent, Conversation, ServerEvent};
pub use socket::{
    ChatConnector, ChatSocket, ChatTransport, ConnectionState, EventStream, SocketConnector,
    SocketOptions,
};
pub use widget::ChatWidget;
