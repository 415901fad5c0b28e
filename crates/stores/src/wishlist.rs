use crate::storage::Storage;
use crate::store::Persisted;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

/// Storage key of the wishlist record.
pub const WISHLIST_KEY: &str = "wishlist-storage";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl WishlistItem {
    pub fn new(id: &str, name: &str, price: Decimal) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            price,
            image: None,
            description: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wishlist {
    pub items: Vec<WishlistItem>,
}

/// Saved products, at most one entry per id.
pub struct WishlistStore {
    inner: Persisted<Wishlist>,
}

impl WishlistStore {
    pub fn open(storage: Arc<dyn Storage>) -> Self {
        Self {
            inner: Persisted::open(WISHLIST_KEY, storage),
        }
    }

    /// Returns `false` (and changes nothing) when the id is already saved.
    pub fn add_item(&self, item: WishlistItem) -> bool {
        self.inner.update(|state| {
            if state.items.iter().any(|existing| existing.id == item.id) {
                return false;
            }
            state.items.push(item);
            true
        })
    }

    pub fn remove_item(&self, id: &str) {
        self.inner.update(|state| {
            let before = state.items.len();
            state.items.retain(|item| item.id != id);
            state.items.len() != before
        });
    }

    /// Add when absent, remove when present. Returns whether the item is
    /// saved afterwards.
    pub fn toggle(&self, item: WishlistItem) -> bool {
        if self.is_in_wishlist(&item.id) {
            self.remove_item(&item.id);
            false
        } else {
            self.add_item(item);
            true
        }
    }

    pub fn is_in_wishlist(&self, id: &str) -> bool {
        self.inner.read(|state| state.items.iter().any(|item| item.id == id))
    }

    pub fn clear(&self) {
        self.inner.reset();
    }

    pub fn items(&self) -> Vec<WishlistItem> {
        self.inner.snapshot().items
    }

    pub fn len(&self) -> usize {
        self.inner.read(|state| state.items.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self) -> watch::Receiver<Wishlist> {
        self.inner.subscribe()
    }
}
