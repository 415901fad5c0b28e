//! Persisted client state for the storefront
//!
//! Three independent stores (cart, wishlist and the authenticated session)
//! each serialized to a durable key-value [`Storage`] and rehydrated on load.

mod cart;
mod error;
mod session;
mod storage;
mod store;
mod wishlist;

use std::sync::Arc;

pub use cart::{Cart, CartItem, CartStore, CART_KEY};
pub use error::StoreError;
pub use session::{Role, Session, SessionStore, SessionUser, SESSION_KEY};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use wishlist::{Wishlist, WishlistItem, WishlistStore, WISHLIST_KEY};

/// All client-side stores sharing one storage backend.
///
/// Session boundaries are also cart and wishlist boundaries: [`ClientStores::logout`]
/// clears all three.
#[derive(Clone)]
pub struct ClientStores {
    pub cart: Arc<CartStore>,
    pub wishlist: Arc<WishlistStore>,
    pub session: Arc<SessionStore>,
}

impl ClientStores {
    /// Rehydrate every store from `storage`.
    pub fn open(storage: Arc<dyn Storage>) -> Self {
        Self {
            cart: Arc::new(CartStore::open(storage.clone())),
            wishlist: Arc::new(WishlistStore::open(storage.clone())),
            session: Arc::new(SessionStore::open(storage)),
        }
    }

    /// Stores backed by process memory only.
    pub fn in_memory() -> Self {
        Self::open(Arc::new(MemoryStorage::new()))
    }

    /// End the session and empty the cart and wishlist.
    pub fn logout(&self) {
        log::info!("Logging out, clearing session, cart and wishlist");
        self.session.logout();
        self.cart.clear();
        self.wishlist.clear();
    }
}
