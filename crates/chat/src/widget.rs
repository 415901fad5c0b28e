use crate::api::ChatApi;
use crate::error::ChatError;
use crate::message::{ChatMessage, ClientEvent, ServerEvent};
use crate::socket::{ChatConnector, ChatTransport, EventStream};
use log::{debug, error};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// The customer side of chat: a single room keyed by the customer's id.
pub struct ChatWidget {
    user_id: String,
    transport: Arc<dyn ChatTransport>,
    messages: Arc<Mutex<Vec<ChatMessage>>>,
    snapshots: Arc<watch::Sender<Vec<ChatMessage>>>,
    dispatcher: JoinHandle<()>,
}

impl ChatWidget {
    /// Connect, join the customer's room and load its history.
    pub async fn start(
        user_id: &str,
        token: &str,
        api: &dyn ChatApi,
        connector: &dyn ChatConnector,
    ) -> Result<Self, ChatError> {
        let (transport, events) = connector.connect(token).await?;
        let widget = Self::with_transport(user_id, transport, events);
        if let Err(e) = widget.open(api).await {
            widget.close().await?;
            return Err(e);
        }
        Ok(widget)
    }

    pub fn with_transport(
        user_id: &str,
        transport: Arc<dyn ChatTransport>,
        events: EventStream,
    ) -> Self {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let (snapshots, _) = watch::channel(Vec::new());
        let snapshots = Arc::new(snapshots);
        let dispatcher = tokio::spawn(dispatch(
            user_id.to_string(),
            events,
            messages.clone(),
            snapshots.clone(),
        ));
        Self {
            user_id: user_id.to_string(),
            transport,
            messages,
            snapshots,
            dispatcher,
        }
    }

    /// Join the room, then merge the stored history in front of anything
    /// already pushed.
    pub async fn open(&self, api: &dyn ChatApi) -> Result<(), ChatError> {
        self.transport
            .emit(ClientEvent::JoinRoom {
                room: self.user_id.clone(),
            })
            .await?;
        let history = api.history(&self.user_id).await?;

        let mut messages = self.messages.lock().await;
        let pushed = std::mem::replace(&mut *messages, history);
        for msg in pushed {
            push_unique(&mut messages, msg);
        }
        self.snapshots.send_replace(messages.clone());
        Ok(())
    }

    /// Publish to the support channel. Shown once echoed back.
    pub async fn send(&self, text: &str) -> Result<(), ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        self.transport
            .emit(ClientEvent::SendMessage {
                room: self.user_id.clone(),
                recipient: None,
                text: text.to_string(),
            })
            .await
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().await.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<ChatMessage>> {
        self.snapshots.subscribe()
    }

    pub async fn close(&self) -> Result<(), ChatError> {
        self.dispatcher.abort();
        self.transport.close().await
    }
}

impl Drop for ChatWidget {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

fn push_unique(messages: &mut Vec<ChatMessage>, msg: ChatMessage) {
    if msg.id.is_none() || !messages.iter().any(|m| m.id == msg.id) {
        messages.push(msg);
    }
}

async fn dispatch(
    user_id: String,
    mut events: EventStream,
    messages: Arc<Mutex<Vec<ChatMessage>>>,
    snapshots: Arc<watch::Sender<Vec<ChatMessage>>>,
) {
    while let Some(event) = events.recv().await {
        let mut messages = messages.lock().await;
        match event {
            ServerEvent::ReceiveMessage(msg) => {
                let ours = msg.room == user_id || (msg.room.is_empty() && msg.involves(&user_id));
                if !ours {
                    debug!("Ignoring message for room '{}'", msg.room);
                    continue;
                }
                push_unique(&mut messages, msg);
            }
            ServerEvent::MessagesRead { room, reader } if room == user_id && reader != user_id => {
                for msg in messages.iter_mut().filter(|m| m.sender == user_id) {
                    msg.read = true;
                }
            }
            ServerEvent::Error { message } => {
                error!("Live channel reported an error: {}", message);
                continue;
            }
            _ => continue,
        }
        snapshots.send_replace(messages.clone());
    }
    debug!("Widget event stream ended");
}
