use crate::storage::Storage;
use crate::store::Persisted;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

/// Storage key of the cart record.
pub const CART_KEY: &str = "cart-storage";

/// A product line in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    /// Always at least 1 once stored.
    pub quantity: u32,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
}

impl CartItem {
    pub fn new(id: &str, name: &str, price: Decimal, quantity: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            price,
            quantity,
            image: None,
            in_stock: None,
            stock: None,
        }
    }

    pub fn with_image(mut self, image: &str) -> Self {
        self.image = Some(image.to_string());
        self
    }

    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Snapshot of the cart contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Sum of quantities across lines.
    pub fn total_items(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}

/// The shopping cart. Sole owner of its [`CartItem`]s.
pub struct CartStore {
    inner: Persisted<Cart>,
}

impl CartStore {
    pub fn open(storage: Arc<dyn Storage>) -> Self {
        Self {
            inner: Persisted::open(CART_KEY, storage),
        }
    }

    /// Merge into an existing line with the same id by summing quantities,
    /// otherwise append.
    pub fn add_item(&self, item: CartItem) {
        let quantity = item.quantity.max(1);
        self.inner.update(|state| {
            match state.items.iter_mut().find(|existing| existing.id == item.id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(quantity);
                }
                None => state.items.push(CartItem { quantity, ..item }),
            }
            true
        });
    }

    /// Absent ids are ignored.
    pub fn remove_item(&self, id: &str) {
        self.inner.update(|state| {
            let before = state.items.len();
            state.items.retain(|item| item.id != id);
            state.items.len() != before
        });
    }

    /// Shift a line's quantity by `delta`, never below 1. Removing a line
    /// is an explicit [`CartStore::remove_item`].
    pub fn update_quantity(&self, id: &str, delta: i64) {
        self.inner.update(|state| {
            let Some(item) = state.items.iter_mut().find(|item| item.id == id) else {
                return false;
            };
            let next = i64::from(item.quantity)
                .saturating_add(delta)
                .clamp(1, i64::from(u32::MAX));
            let next = u32::try_from(next).unwrap_or(u32::MAX);
            let changed = next != item.quantity;
            item.quantity = next;
            changed
        });
    }

    pub fn clear(&self) {
        self.inner.reset();
    }

    pub fn items(&self) -> Vec<CartItem> {
        self.inner.snapshot().items
    }

    pub fn get(&self, id: &str) -> Option<CartItem> {
        self.inner
            .read(|state| state.items.iter().find(|item| item.id == id).cloned())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.read(|state| state.items.iter().any(|item| item.id == id))
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read(|state| state.items.is_empty())
    }

    pub fn total_items(&self) -> u64 {
        self.inner.read(Cart::total_items)
    }

    pub fn subtotal(&self) -> Decimal {
        self.inner.read(Cart::subtotal)
    }

    /// Receiver that observes every cart change.
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.inner.subscribe()
    }
}
