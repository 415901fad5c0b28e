use super::types::*;
use super::ApiClient;
use crate::error::Result;
use crate::query::{ConfirmedDelete, ListParams, QueryKey};
use crate::validation;
use log::info;
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;

/// A REST collection at `/{NAME}`.
pub trait ResourceKind: Send + Sync + 'static {
    /// Path segment and query-cache resource name.
    const NAME: &'static str;

    type Item: DeserializeOwned + Clone + Send + Sync + 'static;
    type Input: Serialize + Send + Sync;

    /// Checked before create and update requests are sent.
    fn validate(_input: &Self::Input) -> Result<()> {
        Ok(())
    }
}

/// A collection that also serves aggregates at `/{NAME}/stats`.
pub trait StatsResource: ResourceKind {
    type Stats: DeserializeOwned + Clone + Send + Sync + 'static;
}

pub struct Products;
pub struct Categories;
pub struct Brands;
pub struct Orders;
pub struct Users;
pub struct Discounts;

impl ResourceKind for Products {
    const NAME: &'static str = "products";
    type Item = Product;
    type Input = ProductInput;

    fn validate(input: &ProductInput) -> Result<()> {
        validation::validate_product(input)
    }
}

impl StatsResource for Products {
    type Stats = ProductStats;
}

impl ResourceKind for Categories {
    const NAME: &'static str = "categories";
    type Item = Category;
    type Input = CategoryInput;
}

impl ResourceKind for Brands {
    const NAME: &'static str = "brands";
    type Item = Brand;
    type Input = BrandInput;
}

impl ResourceKind for Orders {
    const NAME: &'static str = "orders";
    type Item = Order;
    type Input = NewOrder;

    fn validate(input: &NewOrder) -> Result<()> {
        validation::validate_shipping_address(&input.shipping_address)
    }
}

impl StatsResource for Orders {
    type Stats = OrderStats;
}

impl ResourceKind for Users {
    const NAME: &'static str = "users";
    type Item = User;
    type Input = UserInput;
}

impl StatsResource for Users {
    type Stats = UserStats;
}

impl ResourceKind for Discounts {
    const NAME: &'static str = "discounts";
    type Item = DiscountSchedule;
    type Input = NewDiscount;

    fn validate(input: &NewDiscount) -> Result<()> {
        validation::validate_discount(input)
    }
}

impl StatsResource for Discounts {
    type Stats = DiscountStats;
}

/// Client for one collection.
///
/// Reads are served through the query cache; every successful mutation
/// invalidates the collection's list and stats queries.
pub struct Resource<'a, K> {
    pub(super) api: &'a ApiClient,
    kind: PhantomData<K>,
}

impl<'a, K: ResourceKind> Resource<'a, K> {
    pub(super) fn new(api: &'a ApiClient) -> Self {
        Self {
            api,
            kind: PhantomData,
        }
    }

    fn path() -> String {
        format!("/{}", K::NAME)
    }

    /// One page of the collection
    pub async fn list(&self, params: &ListParams) -> Result<Page<K::Item>> {
        let api = self.api;
        let query = params.to_query();
        api.queries()
            .fetch(QueryKey::list(K::NAME, params), || async move {
                api.request(Method::GET, &Self::path())
                    .query(query)
                    .execute::<Page<K::Item>>()
                    .await
            })
            .await
    }

    /// A single record by id
    pub async fn get(&self, id: &str) -> Result<K::Item> {
        let api = self.api;
        api.queries()
            .fetch(QueryKey::detail(K::NAME, id), || async move {
                api.request(Method::GET, &Self::path())
                    .segments([id])
                    .execute::<K::Item>()
                    .await
            })
            .await
    }

    pub async fn create(&self, input: &K::Input) -> Result<K::Item> {
        K::validate(input)?;
        let item = self
            .api
            .request(Method::POST, &Self::path())
            .json(input)?
            .execute::<K::Item>()
            .await?;
        self.invalidate(None);
        Ok(item)
    }

    pub async fn update(&self, id: &str, input: &K::Input) -> Result<K::Item> {
        K::validate(input)?;
        let item = self
            .api
            .request(Method::PUT, &Self::path())
            .segments([id])
            .json(input)?
            .execute::<K::Item>()
            .await?;
        self.invalidate(Some(id));
        Ok(item)
    }

    /// Delete a record. Only a confirmed request is accepted.
    pub async fn delete(&self, confirmed: ConfirmedDelete) -> Result<()> {
        let id = confirmed.id();
        self.api
            .request(Method::DELETE, &Self::path())
            .segments([id])
            .execute_empty()
            .await?;
        info!("Deleted {} {}", K::NAME, id);
        self.invalidate(Some(id));
        Ok(())
    }

    pub(super) fn invalidate(&self, id: Option<&str>) {
        let queries = self.api.queries();
        queries.invalidate(K::NAME);
        if let Some(id) = id {
            queries.invalidate_key(&QueryKey::detail(K::NAME, id));
        }
    }
}

impl<'a, K: StatsResource> Resource<'a, K> {
    /// Aggregate statistics of the collection
    pub async fn stats(&self) -> Result<K::Stats> {
        let api = self.api;
        api.queries()
            .fetch(QueryKey::stats(K::NAME), || async move {
                api.request(Method::GET, &format!("/{}/stats", K::NAME))
                    .execute::<K::Stats>()
                    .await
            })
            .await
    }
}
