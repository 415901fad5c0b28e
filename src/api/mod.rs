//! Typed access to the storefront REST backend

mod auth;
mod chat;
mod dashboard;
mod discounts;
mod orders;
mod resource;
mod types;
mod upload;

use crate::config::Config;
use crate::error::Result;
use crate::fetch::FetchBuilder;
use crate::query::QueryClient;
use reqwest::{Client, Method};
use shopfront_stores::SessionStore;
use std::sync::Arc;

pub use auth::AuthApi;
pub use resource::{
    Brands, Categories, Discounts, Orders, Products, Resource, ResourceKind, StatsResource, Users,
};
pub use types::*;

/// Query resource name of the dashboard aggregates.
pub const DASHBOARD: &str = "dashboard";

/// REST client. Every request carries the current session's bearer token
/// when there is one.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
    session: Arc<SessionStore>,
    queries: QueryClient,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        client: Client,
        session: Arc<SessionStore>,
        queries: QueryClient,
    ) -> Self {
        queries.add_dependent(Orders::NAME, DASHBOARD);
        queries.add_dependent(Products::NAME, DASHBOARD);
        queries.add_dependent(Users::NAME, DASHBOARD);
        // A discount changes the effective product price.
        queries.add_dependent(Discounts::NAME, Products::NAME);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            session,
            queries,
        }
    }

    /// Client with its own HTTP connection pool and query cache.
    pub fn from_config(config: &Config, session: Arc<SessionStore>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::new(
            &config.api_url,
            builder.build()?,
            session,
            QueryClient::new(),
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> FetchBuilder<'_> {
        let builder = FetchBuilder::new(&self.client, &self.url(path), method);
        match self.session.token() {
            Some(token) => builder.bearer_auth(&token),
            None => builder,
        }
    }

    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    pub fn products(&self) -> Resource<'_, Products> {
        Resource::new(self)
    }

    pub fn categories(&self) -> Resource<'_, Categories> {
        Resource::new(self)
    }

    pub fn brands(&self) -> Resource<'_, Brands> {
        Resource::new(self)
    }

    pub fn orders(&self) -> Resource<'_, Orders> {
        Resource::new(self)
    }

    pub fn users(&self) -> Resource<'_, Users> {
        Resource::new(self)
    }

    pub fn discounts(&self) -> Resource<'_, Discounts> {
        Resource::new(self)
    }
}
