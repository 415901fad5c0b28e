use jsonwebtoken::{encode, EncodingKey, Header};
use rust_decimal::Decimal;
use serde_json::json;
use shopfront_stores::{
    CartItem, CartStore, ClientStores, FileStorage, MemoryStorage, Role, Session, SessionStore,
    SessionUser, Storage, Wishlist, WishlistItem, WishlistStore, CART_KEY, SESSION_KEY,
};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

fn item(id: &str, quantity: u32, price: i64) -> CartItem {
    CartItem::new(id, &format!("Product {}", id), Decimal::from(price), quantity)
}

fn user(id: &str, role: Role) -> SessionUser {
    SessionUser {
        id: id.to_string(),
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        role,
        phone: None,
    }
}

fn token_expiring_at(exp: u64) -> String {
    encode(
        &Header::default(),
        &json!({ "sub": "u1", "exp": exp }),
        &EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap()
}

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
}

#[test]
fn test_adding_same_product_sums_quantities() {
    let cart = CartStore::open(Arc::new(MemoryStorage::new()));

    cart.add_item(item("p1", 2, 10));
    cart.add_item(item("p1", 1, 10));

    let items = cart.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 3);
    assert_eq!(items[0].line_total(), Decimal::from(30));
    assert_eq!(cart.subtotal(), Decimal::from(30));
}

#[test]
fn test_quantity_sum_holds_for_many_adds() {
    let cart = CartStore::open(Arc::new(MemoryStorage::new()));
    let quantities = [1u32, 4, 2, 7, 3];
    for q in quantities {
        cart.add_item(item("bulb", q, 2));
    }
    cart.add_item(item("cable", 1, 5));

    assert_eq!(cart.get("bulb").unwrap().quantity, quantities.iter().sum::<u32>());
    assert_eq!(cart.total_items(), 18);
}

#[test]
fn test_zero_quantity_add_is_stored_as_one() {
    let cart = CartStore::open(Arc::new(MemoryStorage::new()));
    cart.add_item(item("p1", 0, 10));
    assert_eq!(cart.get("p1").unwrap().quantity, 1);
}

#[test]
fn test_update_quantity_never_drops_below_one() {
    let cart = CartStore::open(Arc::new(MemoryStorage::new()));
    cart.add_item(item("p1", 5, 10));

    for delta in [-1, -3, -100, i64::MIN] {
        cart.update_quantity("p1", delta);
        assert!(cart.get("p1").unwrap().quantity >= 1);
    }
    assert_eq!(cart.get("p1").unwrap().quantity, 1);

    cart.update_quantity("p1", 4);
    assert_eq!(cart.get("p1").unwrap().quantity, 5);

    cart.update_quantity("p1", i64::MAX);
    assert_eq!(cart.get("p1").unwrap().quantity, u32::MAX);
}

#[test]
fn test_remove_is_idempotent() {
    let cart = CartStore::open(Arc::new(MemoryStorage::new()));
    cart.add_item(item("p1", 1, 10));

    cart.remove_item("p1");
    cart.remove_item("p1");
    cart.remove_item("never-added");

    assert!(cart.is_empty());
}

#[test]
fn test_wishlist_duplicate_add_is_a_no_op() {
    let wishlist = WishlistStore::open(Arc::new(MemoryStorage::new()));
    let first = WishlistItem::new("w1", "Drill", Decimal::from(80));
    let mut renamed = first.clone();
    renamed.name = "Different name".to_string();

    assert!(wishlist.add_item(first.clone()));
    let before = wishlist.items();
    assert!(!wishlist.add_item(renamed));

    assert_eq!(wishlist.items(), before);
    assert_eq!(wishlist.items(), vec![first]);
    assert!(wishlist.is_in_wishlist("w1"));
    assert!(!wishlist.is_in_wishlist("w2"));
}

#[test]
fn test_wishlist_toggle() {
    let wishlist = WishlistStore::open(Arc::new(MemoryStorage::new()));
    let drill = WishlistItem::new("w1", "Drill", Decimal::from(80));

    assert!(wishlist.toggle(drill.clone()));
    assert!(wishlist.is_in_wishlist("w1"));
    assert!(!wishlist.toggle(drill));
    assert!(wishlist.is_empty());
}

#[test]
fn test_wishlist_subscribers_see_changes() {
    let wishlist = WishlistStore::open(Arc::new(MemoryStorage::new()));
    let mut rx = wishlist.subscribe();
    wishlist.add_item(WishlistItem::new("w1", "Drill", Decimal::from(80)));

    assert!(rx.has_changed().unwrap());
    let current: Wishlist = rx.borrow_and_update().clone();
    assert_eq!(current.items.len(), 1);
    assert_eq!(current.items[0].id, "w1");
}

#[test]
fn test_logout_clears_cart_and_wishlist() {
    let stores = ClientStores::in_memory();
    stores
        .session
        .login(Session::new(user("u1", Role::Customer), "token"));
    stores.cart.add_item(item("p1", 2, 10));
    stores.cart.add_item(item("p2", 1, 4));
    stores
        .wishlist
        .add_item(WishlistItem::new("w1", "Drill", Decimal::from(80)));

    stores.logout();

    assert!(stores.cart.is_empty());
    assert!(stores.wishlist.is_empty());
    assert!(!stores.session.is_authenticated());

    // Logging out again with empty stores is fine too.
    stores.logout();
    assert!(stores.cart.is_empty());
}

#[test]
fn test_stores_rehydrate_from_file_storage() {
    let dir = tempfile::tempdir().unwrap();
    {
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(dir.path()).unwrap());
        let stores = ClientStores::open(storage);
        stores.cart.add_item(item("p1", 2, 10).with_image("/img/p1.png"));
        stores
            .wishlist
            .add_item(WishlistItem::new("w1", "Drill", Decimal::from(80)));
        stores
            .session
            .login(Session::new(user("u1", Role::Admin), "plain-token"));
    }

    let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(dir.path()).unwrap());
    let stores = ClientStores::open(storage.clone());
    assert_eq!(stores.cart.get("p1").unwrap().quantity, 2);
    assert_eq!(
        stores.cart.get("p1").unwrap().image.as_deref(),
        Some("/img/p1.png")
    );
    assert!(stores.wishlist.is_in_wishlist("w1"));
    assert!(stores.session.current().unwrap().is_admin());

    let raw: serde_json::Value =
        serde_json::from_str(&storage.get_item(CART_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(raw["version"], 0);
    assert_eq!(raw["state"]["items"][0]["id"], "p1");
}

#[test]
fn test_expired_session_is_not_rehydrated() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    SessionStore::open(storage.clone()).login(Session::new(
        user("u1", Role::Customer),
        &token_expiring_at(now_secs() - 60),
    ));

    let reopened = SessionStore::open(storage.clone());
    assert!(reopened.current().is_none());
    let raw = storage.get_item(SESSION_KEY).unwrap().unwrap();
    assert!(raw.contains("\"state\":null"));
}

#[test]
fn test_unrepresentable_expiry_never_expires() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    SessionStore::open(storage.clone()).login(Session::new(
        user("u1", Role::Customer),
        &token_expiring_at(u64::MAX),
    ));

    let reopened = SessionStore::open(storage);
    let session = reopened.current().unwrap();
    assert_eq!(session.expires_at(), None);
    assert!(!session.is_expired());
}

#[test]
fn test_live_session_is_rehydrated() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let token = token_expiring_at(now_secs() + 3600);
    SessionStore::open(storage.clone()).login(Session::new(user("u1", Role::Business), &token));

    let reopened = SessionStore::open(storage);
    let session = reopened.current().unwrap();
    assert_eq!(session.role(), Role::Business);
    assert!(!session.is_expired());
    assert_eq!(reopened.token().as_deref(), Some(token.as_str()));
}

#[test]
fn test_login_replaces_previous_session() {
    let store = SessionStore::open(Arc::new(MemoryStorage::new()));
    store.login(Session::new(user("u1", Role::Customer), "a"));
    store.login(Session::new(user("u2", Role::Admin), "b"));

    let current = store.current().unwrap();
    assert_eq!(current.user.id, "u2");
    assert_eq!(current.token, "b");
}

#[tokio::test]
async fn test_subscribers_observe_mutations() {
    let cart = CartStore::open(Arc::new(MemoryStorage::new()));
    let mut rx = cart.subscribe();

    cart.add_item(item("p1", 1, 10));
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().items.len(), 1);

    // Removing an unknown id does not notify.
    cart.remove_item("nope");
    assert!(!rx.has_changed().unwrap());

    cart.clear();
    rx.changed().await.unwrap();
    assert!(rx.borrow().items.is_empty());
}
