use crate::storage::Storage;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

const STORE_VERSION: u32 = 0;

/// On-disk record shape shared by every store.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    state: T,
    #[serde(default)]
    version: u32,
}

/// A state slice held in a single watch channel and mirrored to storage
/// after every mutation.
pub(crate) struct Persisted<T> {
    key: &'static str,
    storage: Arc<dyn Storage>,
    state: watch::Sender<T>,
}

impl<T> Persisted<T>
where
    T: Serialize + DeserializeOwned + Clone + Default,
{
    pub(crate) fn open(key: &'static str, storage: Arc<dyn Storage>) -> Self {
        let initial = Self::rehydrate(key, storage.as_ref());
        let (state, _) = watch::channel(initial);
        Self {
            key,
            storage,
            state,
        }
    }

    fn rehydrate(key: &str, storage: &dyn Storage) -> T {
        match storage.get_item(key) {
            Ok(Some(raw)) => match serde_json::from_str::<Envelope<T>>(&raw) {
                Ok(envelope) => {
                    debug!("Rehydrated '{}' (version {})", key, envelope.version);
                    envelope.state
                }
                Err(e) => {
                    warn!("Discarding unreadable record '{}': {}", key, e);
                    T::default()
                }
            },
            Ok(None) => T::default(),
            Err(e) => {
                warn!("Failed to read '{}' from storage: {}", key, e);
                T::default()
            }
        }
    }

    pub(crate) fn snapshot(&self) -> T {
        self.state.borrow().clone()
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.state.borrow())
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<T> {
        self.state.subscribe()
    }

    /// Apply `f`; subscribers are notified and the record persisted only
    /// when `f` reports a change.
    pub(crate) fn update(&self, f: impl FnOnce(&mut T) -> bool) -> bool {
        let changed = self.state.send_if_modified(f);
        if changed {
            self.persist();
        }
        changed
    }

    pub(crate) fn reset(&self) {
        self.state.send_replace(T::default());
        self.persist();
    }

    fn persist(&self) {
        let serialized = {
            let state = self.state.borrow();
            serde_json::to_string(&Envelope {
                state: &*state,
                version: STORE_VERSION,
            })
        };
        let result = serialized
            .map_err(Into::into)
            .and_then(|raw| self.storage.set_item(self.key, &raw));
        if let Err(e) = result {
            warn!("Failed to persist '{}': {}", self.key, e);
        }
    }
}
