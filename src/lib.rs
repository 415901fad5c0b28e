//! Shopfront Rust Client Library
//!
//! A headless client for the hardware storefront and its back-office:
//! persisted cart, wishlist and session state, typed REST resources behind a
//! query cache, currency formatting, form validation, route guards and live
//! customer support chat.

pub mod api;
pub mod config;
pub mod error;
pub mod fetch;
pub mod format;
pub mod guard;
pub mod notify;
pub mod query;
pub mod validation;

pub use shopfront_chat as chat;
pub use shopfront_stores as stores;

use log::{debug, error, info, warn};
use std::sync::Arc;

use crate::api::{ApiClient, NewOrder, Order, ShippingAddress};
use crate::config::Config;
use crate::error::{Error, ErrorKind, Result};
use crate::format::CurrencyFormatter;
use crate::guard::{Access, Area};
use crate::notify::Notifications;
use crate::query::QueryClient;
use shopfront_chat::{ChatConnector, ChatConsole, ChatSupervisor, ChatWidget, SocketConnector};
use shopfront_stores::{
    Cart, CartStore, ClientStores, FileStorage, Session, SessionStore, Storage, WishlistStore,
};

/// The main entry point for the storefront client
pub struct Shopfront {
    config: Config,
    stores: ClientStores,
    api: ApiClient,
    formatter: CurrencyFormatter,
    notifications: Notifications,
    connector: Arc<dyn ChatConnector>,
    chat: ChatSupervisor,
}

impl Shopfront {
    /// Create a client over `storage`, rehydrating the persisted stores.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use shopfront::{config::Config, stores::MemoryStorage, Shopfront};
    /// use std::sync::Arc;
    ///
    /// let config = Config::new("http://localhost:5000/api").unwrap();
    /// let shop = Shopfront::new(config, Arc::new(MemoryStorage::new())).unwrap();
    /// assert!(shop.cart().is_empty());
    /// ```
    pub fn new(config: Config, storage: Arc<dyn Storage>) -> Result<Self> {
        let connector = Arc::new(SocketConnector::new(config.socket_url()?.as_str()));
        Self::with_connector(config, storage, connector)
    }

    /// Create a client whose live channels come from `connector`.
    pub fn with_connector(
        config: Config,
        storage: Arc<dyn Storage>,
        connector: Arc<dyn ChatConnector>,
    ) -> Result<Self> {
        let stores = ClientStores::open(storage);
        let api = ApiClient::from_config(&config, stores.session.clone())?;
        let chat = ChatSupervisor::new(Arc::new(api.clone()), connector.clone());
        debug!("Storefront client for {}", config.api_url);

        Ok(Self {
            formatter: CurrencyFormatter::new(&config.currency),
            config,
            stores,
            api,
            notifications: Notifications::new(),
            connector,
            chat,
        })
    }

    /// Configuration from the environment, stores under its storage directory.
    pub fn from_env() -> Result<Self> {
        let config = Config::from_env()?;
        let storage = FileStorage::new(&config.storage_dir)?;
        Self::new(config, Arc::new(storage))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stores(&self) -> &ClientStores {
        &self.stores
    }

    pub fn cart(&self) -> &CartStore {
        &self.stores.cart
    }

    pub fn wishlist(&self) -> &WishlistStore {
        &self.stores.wishlist
    }

    pub fn session(&self) -> &SessionStore {
        &self.stores.session
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn queries(&self) -> &QueryClient {
        self.api.queries()
    }

    pub fn formatter(&self) -> &CurrencyFormatter {
        &self.formatter
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    pub fn chat(&self) -> &ChatSupervisor {
        &self.chat
    }

    /// Whether the current session may enter `area`.
    pub fn authorize(&self, area: Area) -> Access {
        guard::authorize(self.stores.session.current().as_ref(), area)
    }

    fn require(&self, area: Area) -> Result<Session> {
        let session = self.stores.session.current();
        match guard::authorize(session.as_ref(), area) {
            Access::Allow => session.ok_or_else(|| Error::unauthorized("Not logged in")),
            Access::Redirect(_) if session.is_none() => Err(Error::unauthorized("Not logged in")),
            Access::Redirect(_) => Err(Error::unauthorized("Insufficient role")),
        }
    }

    /// Sign in with email and password; the session is persisted. A chat
    /// channel opened for another identity is closed.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let session = self.api.auth().login(email, password).await?;
        if let Err(e) = self.chat.retain(&session.user.id).await {
            warn!("Error closing chat channel of previous session: {}", e);
        }
        Ok(session)
    }

    /// End the session: closes the chat channel, clears the session, cart
    /// and wishlist, and drops every cached query.
    pub async fn logout(&self) {
        if let Err(e) = self.chat.shutdown().await {
            warn!("Error closing chat channel on logout: {}", e);
        }
        self.stores.logout();
        self.api.queries().clear();
        info!("Logged out");
    }

    /// Place an order for the cart contents. The cart is cleared only when
    /// the order was accepted.
    pub async fn checkout(&self, address: ShippingAddress, payment_method: &str) -> Result<Order> {
        self.require(Area::Account)?;
        validation::validate_shipping_address(&address)?;
        if payment_method.trim().is_empty() {
            return Err(Error::invalid("paymentMethod", "Choose a payment method"));
        }
        let cart = Cart {
            items: self.stores.cart.items(),
        };
        if cart.items.is_empty() {
            return Err(Error::invalid("cart", "Your cart is empty"));
        }

        let order = NewOrder::from_cart(&cart, address, payment_method.trim());
        let placed = self.api.orders().place_order(&order).await?;
        self.stores.cart.clear();
        self.notifications.success("Order placed successfully");
        Ok(placed)
    }

    /// The admin inbox for the current session. Reused while the session
    /// identity stays the same.
    pub async fn admin_chat(&self) -> Result<Arc<ChatConsole>> {
        let session = self.require(Area::Admin)?;
        Ok(self.chat.ensure(&session.user.id, &session.token).await?)
    }

    /// The support chat of the signed-in customer.
    pub async fn customer_chat(&self) -> Result<ChatWidget> {
        let session = self.require(Area::Account)?;
        Ok(ChatWidget::start(
            &session.user.id,
            &session.token,
            &self.api,
            self.connector.as_ref(),
        )
        .await?)
    }

    /// Present an error the way its kind asks for. Returns where to navigate
    /// for authorization failures.
    pub fn report(&self, err: &Error) -> Option<Access> {
        match err.kind() {
            ErrorKind::Transient => {
                warn!("Request failed: {}", err);
                let message = match err {
                    Error::Api { message, .. } => message.clone(),
                    Error::Http(_) => "Network error, please try again".to_string(),
                    other => other.to_string(),
                };
                self.notifications.error(&message);
                None
            }
            ErrorKind::Validation => {
                debug!("{}", err);
                None
            }
            ErrorKind::Authorization => {
                let redirect = if self.stores.session.is_authenticated() {
                    guard::HOME_PATH
                } else {
                    guard::LOGIN_PATH
                };
                info!("{}, redirecting to {}", err, redirect);
                Some(Access::Redirect(redirect))
            }
            ErrorKind::Channel => {
                warn!("Chat channel error: {}", err);
                self.notifications.warning("Live chat is unavailable");
                None
            }
            ErrorKind::Internal => {
                error!("{}", err);
                self.notifications.error(&err.to_string());
                None
            }
        }
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::api::{ApiClient, Page, Pagination};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::format::{format_price, CurrencyFormatter};
    pub use crate::query::{DeleteRequest, ListParams, ListView, LoadState};
    pub use crate::Shopfront;
    pub use shopfront_stores::{CartItem, Role, Session, WishlistItem};
}
