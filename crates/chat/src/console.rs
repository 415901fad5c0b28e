use crate::api::ChatApi;
use crate::error::ChatError;
use crate::inbox::{Inbox, InboxSnapshot};
use crate::message::{ClientEvent, ServerEvent};
use crate::socket::{ChatConnector, ChatTransport, EventStream};
use log::{debug, error, info, trace, warn};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// The admin side of chat: one live channel, one inbox.
///
/// Pushed events are applied by a dispatcher task that owns the receiving
/// end of the channel; observers read [`InboxSnapshot`]s from
/// [`ChatConsole::subscribe`].
pub struct ChatConsole {
    admin_id: String,
    api: Arc<dyn ChatApi>,
    transport: Arc<dyn ChatTransport>,
    inbox: Arc<Mutex<Inbox>>,
    snapshots: Arc<watch::Sender<InboxSnapshot>>,
    dispatcher: JoinHandle<()>,
}

impl ChatConsole {
    /// Open a channel authenticated with `token` and load the inbox.
    pub async fn start(
        admin_id: &str,
        token: &str,
        api: Arc<dyn ChatApi>,
        connector: &dyn ChatConnector,
    ) -> Result<Self, ChatError> {
        let (transport, events) = connector.connect(token).await?;
        let console = Self::with_transport(admin_id, api, transport, events);
        if let Err(e) = console.refresh_conversations().await {
            console.close().await?;
            return Err(e);
        }
        Ok(console)
    }

    /// Build a console over an already open channel.
    pub fn with_transport(
        admin_id: &str,
        api: Arc<dyn ChatApi>,
        transport: Arc<dyn ChatTransport>,
        events: EventStream,
    ) -> Self {
        let inbox = Arc::new(Mutex::new(Inbox::new(admin_id)));
        let (snapshots, _) = watch::channel(InboxSnapshot::default());
        let snapshots = Arc::new(snapshots);
        let dispatcher = tokio::spawn(dispatch(events, inbox.clone(), snapshots.clone()));
        Self {
            admin_id: admin_id.to_string(),
            api,
            transport,
            inbox,
            snapshots,
            dispatcher,
        }
    }

    pub fn admin_id(&self) -> &str {
        &self.admin_id
    }

    /// Reload the conversation list.
    pub async fn refresh_conversations(&self) -> Result<(), ChatError> {
        let conversations = self.api.conversations().await?;
        let mut inbox = self.inbox.lock().await;
        inbox.load_conversations(conversations);
        self.publish(&inbox);
        Ok(())
    }

    /// Select a conversation: leave the previously open room, load the
    /// history, acknowledge its unread messages, then join its room so
    /// pushed events are delivered.
    pub async fn open_conversation(&self, user_id: &str) -> Result<(), ChatError> {
        let (ticket, previous) = {
            let mut inbox = self.inbox.lock().await;
            let previous = inbox
                .selected()
                .filter(|room| *room != user_id)
                .map(str::to_string);
            let ticket = inbox.select(user_id);
            self.publish(&inbox);
            (ticket, previous)
        };
        info!("Opening conversation with {}", user_id);

        if let Some(room) = previous {
            self.transport.emit(ClientEvent::LeaveRoom { room }).await?;
        }

        let history = self.api.history(user_id).await?;
        {
            let mut inbox = self.inbox.lock().await;
            if !inbox.apply_history(&ticket, history) {
                return Ok(());
            }
            self.publish(&inbox);
        }

        self.api.mark_read(user_id).await?;
        {
            let mut inbox = self.inbox.lock().await;
            inbox.acknowledge(user_id);
            self.publish(&inbox);
        }

        self.transport
            .emit(ClientEvent::JoinRoom {
                room: user_id.to_string(),
            })
            .await
    }

    /// Publish `text` to the open conversation. Nothing is appended locally;
    /// the message shows up once the channel echoes it back.
    pub async fn send(&self, text: &str) -> Result<(), ChatError> {
        let text = text.trim();
        if text.is_empty() {
            debug!("Ignoring empty message");
            return Ok(());
        }
        let room = self
            .inbox
            .lock()
            .await
            .selected()
            .map(str::to_string)
            .ok_or_else(|| ChatError::Channel("No conversation is open".to_string()))?;
        self.transport
            .emit(ClientEvent::SendMessage {
                recipient: Some(room.clone()),
                room,
                text: text.to_string(),
            })
            .await
    }

    pub async fn snapshot(&self) -> InboxSnapshot {
        self.inbox.lock().await.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<InboxSnapshot> {
        self.snapshots.subscribe()
    }

    /// Stop dispatching and close the channel.
    pub async fn close(&self) -> Result<(), ChatError> {
        self.dispatcher.abort();
        self.transport.close().await
    }

    fn publish(&self, inbox: &Inbox) {
        self.snapshots.send_replace(inbox.snapshot());
    }
}

impl Drop for ChatConsole {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

async fn dispatch(
    mut events: EventStream,
    inbox: Arc<Mutex<Inbox>>,
    snapshots: Arc<watch::Sender<InboxSnapshot>>,
) {
    while let Some(event) = events.recv().await {
        let mut inbox = inbox.lock().await;
        match event {
            ServerEvent::ReceiveMessage(msg) => {
                let delivery = inbox.receive(msg);
                trace!("Message delivered to {:?}", delivery);
            }
            ServerEvent::MessagesRead { room, reader } => inbox.messages_read(&room, &reader),
            ServerEvent::Error { message } => {
                error!("Live channel reported an error: {}", message);
                continue;
            }
            ServerEvent::Pong => continue,
        }
        snapshots.send_replace(inbox.snapshot());
    }
    debug!("Live channel event stream ended");
}

struct ActiveConsole {
    user_id: String,
    token: String,
    console: Arc<ChatConsole>,
}

/// Keeps at most one [`ChatConsole`], bound to the identity of the
/// authenticated session.
pub struct ChatSupervisor {
    api: Arc<dyn ChatApi>,
    connector: Arc<dyn ChatConnector>,
    active: Mutex<Option<ActiveConsole>>,
}

impl ChatSupervisor {
    pub fn new(api: Arc<dyn ChatApi>, connector: Arc<dyn ChatConnector>) -> Self {
        Self {
            api,
            connector,
            active: Mutex::new(None),
        }
    }

    /// The console for this identity. A console held for a different
    /// identity is closed before the new channel is opened.
    pub async fn ensure(&self, user_id: &str, token: &str) -> Result<Arc<ChatConsole>, ChatError> {
        let mut active = self.active.lock().await;
        if let Some(current) = active.as_ref() {
            if current.user_id == user_id && current.token == token {
                return Ok(current.console.clone());
            }
        }
        if let Some(previous) = active.take() {
            info!("Session identity changed, closing chat for {}", previous.user_id);
            if let Err(e) = previous.console.close().await {
                warn!("Error closing previous chat channel: {}", e);
            }
        }

        let console = Arc::new(
            ChatConsole::start(user_id, token, self.api.clone(), self.connector.as_ref()).await?,
        );
        *active = Some(ActiveConsole {
            user_id: user_id.to_string(),
            token: token.to_string(),
            console: console.clone(),
        });
        Ok(console)
    }

    pub async fn current(&self) -> Option<Arc<ChatConsole>> {
        self.active.lock().await.as_ref().map(|a| a.console.clone())
    }

    /// Close the held console unless it belongs to `user_id`.
    pub async fn retain(&self, user_id: &str) -> Result<(), ChatError> {
        let mut active = self.active.lock().await;
        match active.as_ref() {
            Some(current) if current.user_id != user_id => {
                info!("Session identity changed, closing chat for {}", current.user_id);
                match active.take() {
                    Some(previous) => previous.console.close().await,
                    None => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }

    /// Close the held console, if any.
    pub async fn shutdown(&self) -> Result<(), ChatError> {
        match self.active.lock().await.take() {
            Some(previous) => previous.console.close().await,
            None => Ok(()),
        }
    }
}
