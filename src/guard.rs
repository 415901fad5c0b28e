//! Route access guards
//!
//! Unauthorized navigation redirects instead of rendering an error.

use shopfront_stores::{Role, Session};

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";

/// A protected region of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    Public,
    /// Profile, order history and checkout.
    Account,
    Admin,
    Business,
}

impl Area {
    /// The area a route path belongs to.
    pub fn for_path(path: &str) -> Self {
        let first = path
            .trim_start_matches('/')
            .split(['/', '?'])
            .next()
            .unwrap_or("");
        match first {
            "admin" => Area::Admin,
            "business" => Area::Business,
            "account" | "profile" | "orders" | "checkout" | "wishlist" => Area::Account,
            _ => Area::Public,
        }
    }

    fn required_role(&self) -> Option<Role> {
        match self {
            Area::Admin => Some(Role::Admin),
            Area::Business => Some(Role::Business),
            Area::Public | Area::Account => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allow,
    Redirect(&'static str),
}

impl Access {
    pub fn is_allowed(&self) -> bool {
        *self == Access::Allow
    }
}

/// Decide whether `session` may enter `area`. An expired session counts as
/// anonymous.
pub fn authorize(session: Option<&Session>, area: Area) -> Access {
    if area == Area::Public {
        return Access::Allow;
    }
    let session = match session.filter(|s| !s.is_expired()) {
        Some(session) => session,
        None => return Access::Redirect(LOGIN_PATH),
    };
    match area.required_role() {
        Some(role) if session.role() != role => Access::Redirect(HOME_PATH),
        _ => Access::Allow,
    }
}
