//! Authenticated session

use crate::storage::Storage;
use crate::store::Persisted;
use jsonwebtoken::{decode, DecodingKey, Validation};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;

/// Storage key of the session record.
pub const SESSION_KEY: &str = "user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
    Business,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
            Role::Business => "business",
        };
        write!(f, "{}", s)
    }
}

/// Identity of the signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Session data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: SessionUser,
    /// The bearer credential
    pub token: String,
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    exp: Option<u64>,
}

impl Session {
    pub fn new(user: SessionUser, token: &str) -> Self {
        Self {
            user,
            token: token.to_string(),
        }
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn is_admin(&self) -> bool {
        self.user.role == Role::Admin
    }

    /// The `exp` claim of the bearer token, when it is a JWT carrying one
    /// that `SystemTime` can represent. The signature is not checked.
    pub fn expires_at(&self) -> Option<SystemTime> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let key = DecodingKey::from_secret(&[]);
        let data = decode::<TokenClaims>(&self.token, &key, &validation).ok()?;
        let exp = data.claims.exp?;
        UNIX_EPOCH.checked_add(Duration::from_secs(exp))
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at()
            .map(|at| SystemTime::now() >= at)
            .unwrap_or(false)
    }
}

/// Holds at most one active session.
pub struct SessionStore {
    inner: Persisted<Option<Session>>,
}

impl SessionStore {
    pub fn open(storage: Arc<dyn Storage>) -> Self {
        let store = Self {
            inner: Persisted::open(SESSION_KEY, storage),
        };
        let expired = store
            .inner
            .read(|slot| slot.as_ref().map(Session::is_expired).unwrap_or(false));
        if expired {
            info!("Stored session token has expired, discarding it");
            store.inner.reset();
        }
        store
    }

    /// Replace any previous session.
    pub fn login(&self, session: Session) {
        debug!(
            "Session started for {} ({})",
            session.user.id, session.user.role
        );
        self.inner.update(|slot| {
            *slot = Some(session);
            true
        });
    }

    /// Only the session itself; see `ClientStores::logout` for the cascade.
    pub fn logout(&self) {
        self.inner.reset();
    }

    pub fn current(&self) -> Option<Session> {
        self.inner.snapshot()
    }

    pub fn token(&self) -> Option<String> {
        self.inner
            .read(|slot| slot.as_ref().map(|s| s.token.clone()))
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read(|slot| slot.is_some())
    }

    /// Notified on login and logout.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.inner.subscribe()
    }
}
