use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::json;
use shopfront::api::ShippingAddress;
use shopfront::chat::{ChatConnector, ChatError, ChatTransport, ClientEvent, EventStream};
use shopfront::config::Config;
use shopfront::error::{Error, ErrorKind};
use shopfront::guard::{Access, Area};
use shopfront::notify::Level;
use shopfront::stores::{CartItem, FileStorage, MemoryStorage, WishlistItem};
use shopfront::Shopfront;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct FakeTransport {
    emitted: Mutex<Vec<ClientEvent>>,
    closed: AtomicBool,
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn emit(&self, event: ClientEvent) -> Result<(), ChatError> {
        self.emitted.lock().unwrap().push(event);
        Ok(())
    }

    async fn close(&self) -> Result<(), ChatError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct FakeConnector {
    opened: Mutex<Vec<(String, Arc<FakeTransport>)>>,
}

#[async_trait]
impl ChatConnector for FakeConnector {
    async fn connect(
        &self,
        token: &str,
    ) -> Result<(Arc<dyn ChatTransport>, EventStream), ChatError> {
        let transport = Arc::new(FakeTransport::default());
        // The sender is dropped: no pushed events in these tests.
        let (_tx, rx) = mpsc::unbounded_channel();
        self.opened
            .lock()
            .unwrap()
            .push((token.to_string(), transport.clone()));
        Ok((transport, rx))
    }
}

fn shop(server: &MockServer) -> (Shopfront, Arc<FakeConnector>) {
    let config = Config::new(&server.uri()).unwrap().with_currency("INR");
    let connector = Arc::new(FakeConnector::default());
    let shop =
        Shopfront::with_connector(config, Arc::new(MemoryStorage::new()), connector.clone())
            .unwrap();
    (shop, connector)
}

async fn mount_login(server: &MockServer, role: &str, token: &str) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": token,
            "user": {
                "_id": format!("{}-1", role),
                "name": "Sam",
                "email": "sam@example.com",
                "role": role
            }
        })))
        .mount(server)
        .await;
}

fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Sam Okafor".to_string(),
        phone: "+234 801 234 5678".to_string(),
        street: "12 Allen Avenue".to_string(),
        city: "Ikeja".to_string(),
        state: Some("Lagos".to_string()),
        postal_code: "100271".to_string(),
        country: "Nigeria".to_string(),
    }
}

#[tokio::test]
async fn test_checkout_places_order_and_clears_cart() {
    let server = MockServer::start().await;
    mount_login(&server, "customer", "cust-token").await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(header("authorization", "Bearer cust-token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "_id": "o1",
            "items": [{ "product": "p1", "name": "32A MCB", "price": 10, "quantity": 3 }],
            "total": 30,
            "status": "pending"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (shop, _) = shop(&server);
    shop.login("sam@example.com", "secret1").await.unwrap();
    shop.cart()
        .add_item(CartItem::new("p1", "32A MCB", Decimal::from(10), 2));
    shop.cart()
        .add_item(CartItem::new("p1", "32A MCB", Decimal::from(10), 1));
    assert_eq!(shop.formatter().format(shop.cart().subtotal()), "₹30.00");

    let order = shop.checkout(address(), "cod").await.unwrap();
    assert_eq!(order.id, "o1");
    assert_eq!(order.total, Decimal::from(30));
    assert!(shop.cart().is_empty());
    assert_eq!(shop.notifications().list()[0].level, Level::Success);
}

#[tokio::test]
async fn test_checkout_failure_keeps_cart_and_notifies() {
    let server = MockServer::start().await;
    mount_login(&server, "customer", "cust-token").await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "message": "Out of stock" })),
        )
        .mount(&server)
        .await;

    let (shop, _) = shop(&server);
    shop.login("sam@example.com", "secret1").await.unwrap();
    shop.cart()
        .add_item(CartItem::new("p1", "32A MCB", Decimal::from(10), 1));

    let err = shop.checkout(address(), "card").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transient);
    assert_eq!(shop.report(&err), None);
    assert_eq!(shop.cart().total_items(), 1);

    let notifications = shop.notifications().list();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].level, Level::Error);
    assert_eq!(notifications[0].message, "Out of stock");
}

#[tokio::test]
async fn test_checkout_is_validated_before_sending() {
    let server = MockServer::start().await;
    mount_login(&server, "customer", "cust-token").await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let (shop, _) = shop(&server);

    let err = shop.checkout(address(), "cod").await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
    assert_eq!(shop.report(&err), Some(Access::Redirect("/login")));

    shop.login("sam@example.com", "secret1").await.unwrap();
    let err = shop.checkout(address(), "cod").await.unwrap_err();
    match &err {
        Error::Validation(errors) => assert!(errors.get("cart").is_some()),
        other => panic!("unexpected error {:?}", other),
    }

    shop.cart()
        .add_item(CartItem::new("p1", "32A MCB", Decimal::from(10), 1));
    let mut incomplete = address();
    incomplete.city = String::new();
    match shop.checkout(incomplete, "cod").await.unwrap_err() {
        Error::Validation(errors) => assert_eq!(errors.get("city"), Some("City is required")),
        other => panic!("unexpected error {:?}", other),
    }
    assert!(shop.notifications().is_empty());
}

#[tokio::test]
async fn test_logout_clears_everything() {
    let server = MockServer::start().await;
    mount_login(&server, "admin", "admin-token").await;
    Mock::given(method("GET"))
        .and(path("/chat/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let (shop, connector) = shop(&server);
    shop.login("sam@example.com", "secret1").await.unwrap();
    shop.cart()
        .add_item(CartItem::new("p1", "32A MCB", Decimal::from(10), 1));
    shop.wishlist()
        .add_item(WishlistItem::new("p2", "Ceiling fan", Decimal::from(80)));
    let console = shop.admin_chat().await.unwrap();
    assert_eq!(console.admin_id(), "admin-1");
    assert_eq!(connector.opened.lock().unwrap()[0].0, "admin-token");

    shop.logout().await;

    assert!(shop.session().current().is_none());
    assert!(shop.cart().is_empty());
    assert!(shop.wishlist().is_empty());
    assert!(shop.queries().is_empty());
    assert!(shop.chat().current().await.is_none());
    assert!(connector.opened.lock().unwrap()[0]
        .1
        .closed
        .load(Ordering::SeqCst));
    assert_eq!(shop.authorize(Area::Admin), Access::Redirect("/login"));
}

#[tokio::test]
async fn test_admin_chat_requires_admin_role() {
    let server = MockServer::start().await;
    mount_login(&server, "customer", "cust-token").await;

    let (shop, connector) = shop(&server);
    shop.login("sam@example.com", "secret1").await.unwrap();
    assert_eq!(shop.authorize(Area::Admin), Access::Redirect("/"));

    let err = match shop.admin_chat().await {
        Err(err) => err,
        Ok(_) => panic!("customer was handed the admin console"),
    };
    assert_eq!(shop.report(&err), Some(Access::Redirect("/")));
    assert!(connector.opened.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_login_as_other_user_closes_admin_chat() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "admin-token",
            "user": { "_id": "admin-1", "name": "Ada", "email": "ada@example.com", "role": "admin" }
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_login(&server, "customer", "cust-token").await;
    Mock::given(method("GET"))
        .and(path("/chat/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let (shop, connector) = shop(&server);
    shop.login("ada@example.com", "secret1").await.unwrap();
    shop.admin_chat().await.unwrap();

    let session = shop.login("sam@example.com", "secret1").await.unwrap();
    assert_eq!(session.user.id, "customer-1");
    assert!(shop.chat().current().await.is_none());
    assert!(connector.opened.lock().unwrap()[0]
        .1
        .closed
        .load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_login_as_same_user_keeps_admin_chat() {
    let server = MockServer::start().await;
    mount_login(&server, "admin", "admin-token").await;
    Mock::given(method("GET"))
        .and(path("/chat/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let (shop, connector) = shop(&server);
    shop.login("sam@example.com", "secret1").await.unwrap();
    shop.admin_chat().await.unwrap();
    shop.login("sam@example.com", "secret1").await.unwrap();

    assert_eq!(
        shop.chat().current().await.map(|c| c.admin_id().to_string()),
        Some("admin-1".to_string())
    );
    assert!(!connector.opened.lock().unwrap()[0]
        .1
        .closed
        .load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_chat_failure_is_reported_as_warning() {
    let server = MockServer::start().await;
    let (shop, _) = shop(&server);

    let err = Error::Chat(ChatError::Connection("Channel is closed".to_string()));
    assert_eq!(shop.report(&err), None);
    let notifications = shop.notifications().list();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].level, Level::Warning);
}

#[tokio::test]
async fn test_customer_chat_joins_own_room() {
    let server = MockServer::start().await;
    mount_login(&server, "customer", "cust-token").await;
    Mock::given(method("GET"))
        .and(path("/chat/messages/customer-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "_id": "m1",
            "sender": "customer-1",
            "recipient": "admin-1",
            "room": "customer-1",
            "text": "Do you deliver to Ikeja?",
            "createdAt": "2024-03-01T10:00:00Z"
        }])))
        .mount(&server)
        .await;

    let (shop, connector) = shop(&server);
    shop.login("sam@example.com", "secret1").await.unwrap();
    let widget = shop.customer_chat().await.unwrap();

    assert_eq!(widget.messages().await.len(), 1);
    let transport = connector.opened.lock().unwrap()[0].1.clone();
    assert_eq!(
        transport.emitted.lock().unwrap()[0],
        ClientEvent::JoinRoom {
            room: "customer-1".to_string()
        }
    );
    widget.close().await.unwrap();
}

#[tokio::test]
async fn test_stores_survive_restart() {
    let server = MockServer::start().await;
    mount_login(&server, "customer", "cust-token").await;
    let dir = tempfile::tempdir().unwrap();
    let config = Config::new(&server.uri()).unwrap();

    {
        let shop = Shopfront::new(
            config.clone(),
            Arc::new(FileStorage::new(dir.path()).unwrap()),
        )
        .unwrap();
        shop.login("sam@example.com", "secret1").await.unwrap();
        shop.cart()
            .add_item(CartItem::new("p9", "Cable drum", Decimal::from(45), 2));
    }

    let shop = Shopfront::new(config, Arc::new(FileStorage::new(dir.path()).unwrap())).unwrap();
    assert_eq!(shop.session().token().as_deref(), Some("cust-token"));
    assert_eq!(shop.cart().get("p9").unwrap().quantity, 2);
}
