//! Admin inbox reconciliation
//!
//! [`Inbox`] is the pure state behind the admin console: the ordered list of
//! per-customer conversations plus the transcript of the one currently open.
//! It performs no I/O; [`crate::ChatConsole`] feeds it request results and
//! pushed events.

use crate::message::{ChatMessage, ChatUser, Conversation};
use log::{debug, trace};

/// Where an inbound message ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Appended to the open transcript (and reflected in the list).
    Transcript,
    /// Only the conversation list's preview, ordering or unread count changed.
    ListOnly,
}

/// Issued by [`Inbox::select`]; history loaded for a superseded selection is
/// discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTicket {
    room: String,
    generation: u64,
}

impl HistoryTicket {
    pub fn room(&self) -> &str {
        &self.room
    }
}

/// Read-only copy of the inbox handed to observers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InboxSnapshot {
    pub conversations: Vec<Conversation>,
    pub selected: Option<String>,
    pub transcript: Vec<ChatMessage>,
    pub loading_history: bool,
}

impl InboxSnapshot {
    pub fn conversation(&self, user_id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.user.id == user_id)
    }

    pub fn unread_total(&self) -> u32 {
        self.conversations.iter().map(|c| c.unread_count).sum()
    }
}

#[derive(Debug, Clone)]
pub struct Inbox {
    admin_id: String,
    conversations: Vec<Conversation>,
    selected: Option<String>,
    transcript: Vec<ChatMessage>,
    generation: u64,
    loading_history: bool,
}

impl Inbox {
    pub fn new(admin_id: &str) -> Self {
        Self {
            admin_id: admin_id.to_string(),
            conversations: Vec::new(),
            selected: None,
            transcript: Vec::new(),
            generation: 0,
            loading_history: false,
        }
    }

    pub fn admin_id(&self) -> &str {
        &self.admin_id
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Replace the list with the backend's, newest activity first.
    pub fn load_conversations(&mut self, mut conversations: Vec<Conversation>) {
        // `None` sorts before `Some`, so reversing puts undated entries last.
        conversations.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        debug!("Inbox loaded {} conversations", conversations.len());
        self.conversations = conversations;
    }

    /// Open `user_id`'s conversation. The transcript is emptied until
    /// [`Inbox::apply_history`] is called with the returned ticket.
    pub fn select(&mut self, user_id: &str) -> HistoryTicket {
        self.generation += 1;
        self.selected = Some(user_id.to_string());
        self.transcript.clear();
        self.loading_history = true;
        HistoryTicket {
            room: user_id.to_string(),
            generation: self.generation,
        }
    }

    /// Install loaded history. Returns `false` when the ticket is stale.
    pub fn apply_history(&mut self, ticket: &HistoryTicket, history: Vec<ChatMessage>) -> bool {
        if ticket.generation != self.generation
            || self.selected.as_deref() != Some(ticket.room.as_str())
        {
            debug!(
                "Dropping history for '{}' (superseded selection)",
                ticket.room
            );
            return false;
        }
        // Keep anything pushed while the request was in flight.
        let pushed = std::mem::take(&mut self.transcript);
        self.transcript = history;
        for msg in pushed {
            self.push_transcript(msg);
        }
        self.loading_history = false;
        true
    }

    /// The backend acknowledged a read receipt for `user_id`.
    pub fn acknowledge(&mut self, user_id: &str) {
        if let Some(conversation) = self.conversation_mut(user_id) {
            conversation.unread_count = 0;
        }
        if self.selected.as_deref() == Some(user_id) {
            for msg in self.transcript.iter_mut().filter(|m| m.sender == user_id) {
                msg.read = true;
            }
        }
    }

    /// Room key of a message. Falls back to the customer party when the
    /// payload carries no room.
    pub fn room_of<'a>(&self, msg: &'a ChatMessage) -> &'a str {
        if !msg.room.is_empty() {
            &msg.room
        } else if msg.sender == self.admin_id {
            &msg.recipient
        } else {
            &msg.sender
        }
    }

    /// Whether a pushed message belongs to the open conversation.
    pub fn is_open_room(&self, msg: &ChatMessage) -> bool {
        match self.selected.as_deref() {
            Some(selected) => self.room_of(msg) == selected || msg.involves(selected),
            None => false,
        }
    }

    /// Reconcile a pushed message. Only messages of the open room reach the
    /// transcript; every message refreshes its conversation's preview and
    /// moves it to the top.
    pub fn receive(&mut self, msg: ChatMessage) -> Delivery {
        let room = self.room_of(&msg).to_string();
        let open = self.is_open_room(&msg);
        let inbound = msg.sender != self.admin_id;

        let index = match self.conversations.iter().position(|c| c.user.id == room) {
            Some(index) => index,
            None => {
                debug!("First message in room '{}', adding conversation", room);
                self.conversations.push(Conversation {
                    user: ChatUser {
                        id: room.clone(),
                        name: room.clone(),
                        email: None,
                    },
                    last_message: None,
                    last_message_at: None,
                    unread_count: 0,
                });
                self.conversations.len() - 1
            }
        };
        let mut conversation = self.conversations.remove(index);
        conversation.last_message = Some(msg.text.clone());
        conversation.last_message_at = Some(msg.created_at);
        if inbound && !open && !msg.read {
            conversation.unread_count += 1;
        }
        self.conversations.insert(0, conversation);

        if open {
            trace!("Message for open room '{}' appended", room);
            self.push_transcript(msg);
            Delivery::Transcript
        } else {
            trace!("Message for background room '{}'", room);
            Delivery::ListOnly
        }
    }

    /// `reader` has read the messages of `room`.
    pub fn messages_read(&mut self, room: &str, reader: &str) {
        if reader == self.admin_id {
            self.acknowledge(room);
            return;
        }
        if self.selected.as_deref() == Some(room) {
            for msg in self
                .transcript
                .iter_mut()
                .filter(|m| m.sender == self.admin_id)
            {
                msg.read = true;
            }
        }
    }

    pub fn snapshot(&self) -> InboxSnapshot {
        InboxSnapshot {
            conversations: self.conversations.clone(),
            selected: self.selected.clone(),
            transcript: self.transcript.clone(),
            loading_history: self.loading_history,
        }
    }

    fn conversation_mut(&mut self, user_id: &str) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.user.id == user_id)
    }

    fn push_transcript(&mut self, msg: ChatMessage) {
        let duplicate = msg.id.is_some() && self.transcript.iter().any(|m| m.id == msg.id);
        if !duplicate {
            self.transcript.push(msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn conversation(user: &str, unread: u32, minute: u32) -> Conversation {
        Conversation {
            user: ChatUser {
                id: user.to_string(),
                name: format!("Customer {}", user),
                email: None,
            },
            last_message: Some("earlier".to_string()),
            last_message_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, minute, 0).unwrap()),
            unread_count: unread,
        }
    }

    fn message(id: &str, from: &str, to: &str, room: &str, text: &str) -> ChatMessage {
        ChatMessage {
            id: Some(id.to_string()),
            sender: from.to_string(),
            recipient: to.to_string(),
            room: room.to_string(),
            text: text.to_string(),
            read: false,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn conversations_are_ordered_newest_first() {
        let mut inbox = Inbox::new("admin");
        inbox.load_conversations(vec![
            conversation("a", 0, 1),
            Conversation {
                last_message_at: None,
                ..conversation("quiet", 0, 0)
            },
            conversation("b", 0, 30),
        ]);
        let order: Vec<&str> = inbox.conversations().iter().map(|c| c.user_id()).collect();
        assert_eq!(order, vec!["b", "a", "quiet"]);
    }

    #[test]
    fn background_room_message_updates_list_only() {
        let mut inbox = Inbox::new("admin");
        inbox.load_conversations(vec![conversation("a", 0, 30), conversation("b", 1, 1)]);
        let ticket = inbox.select("a");
        assert!(inbox.apply_history(&ticket, vec![message("m0", "a", "admin", "a", "hello")]));

        let delivery = inbox.receive(message("m1", "b", "admin", "b", "any 12V adapters?"));

        assert_eq!(delivery, Delivery::ListOnly);
        assert_eq!(inbox.transcript().len(), 1);
        let snapshot = inbox.snapshot();
        let b = snapshot.conversation("b").unwrap();
        assert_eq!(b.unread_count, 2);
        assert_eq!(b.last_message.as_deref(), Some("any 12V adapters?"));
        assert_eq!(snapshot.conversations[0].user.id, "b");
    }

    #[test]
    fn open_room_message_is_appended_without_unread() {
        let mut inbox = Inbox::new("admin");
        inbox.load_conversations(vec![conversation("a", 0, 30)]);
        let ticket = inbox.select("a");
        inbox.apply_history(&ticket, Vec::new());

        assert_eq!(
            inbox.receive(message("m1", "a", "admin", "a", "thanks")),
            Delivery::Transcript
        );
        // Echo of the same message is not duplicated.
        assert_eq!(
            inbox.receive(message("m1", "a", "admin", "a", "thanks")),
            Delivery::Transcript
        );
        assert_eq!(inbox.transcript().len(), 1);
        assert_eq!(inbox.snapshot().conversation("a").unwrap().unread_count, 0);
    }

    #[test]
    fn roomless_message_matches_by_identity() {
        let mut inbox = Inbox::new("admin");
        inbox.select("a");
        let reply = message("m2", "admin", "a", "", "on its way");
        assert_eq!(inbox.room_of(&reply), "a");
        assert_eq!(inbox.receive(reply), Delivery::Transcript);
    }

    #[test]
    fn stale_history_is_dropped() {
        let mut inbox = Inbox::new("admin");
        let first = inbox.select("a");
        let second = inbox.select("b");

        assert!(!inbox.apply_history(&first, vec![message("m0", "a", "admin", "a", "x")]));
        assert!(inbox.transcript().is_empty());
        assert!(inbox.apply_history(&second, vec![message("m1", "b", "admin", "b", "y")]));
        assert_eq!(inbox.transcript()[0].room, "b");
        assert!(!inbox.snapshot().loading_history);
    }

    #[test]
    fn unknown_room_creates_conversation() {
        let mut inbox = Inbox::new("admin");
        inbox.receive(message("m1", "new", "admin", "new", "hi"));
        let snapshot = inbox.snapshot();
        assert_eq!(snapshot.conversations.len(), 1);
        assert_eq!(snapshot.conversation("new").unwrap().unread_count, 1);
    }

    #[test]
    fn read_receipts_from_customer_mark_admin_messages() {
        let mut inbox = Inbox::new("admin");
        let ticket = inbox.select("a");
        inbox.apply_history(
            &ticket,
            vec![
                message("m0", "a", "admin", "a", "question"),
                message("m1", "admin", "a", "a", "answer"),
            ],
        );
        inbox.messages_read("a", "a");
        assert!(!inbox.transcript()[0].read);
        assert!(inbox.transcript()[1].read);
    }
}
