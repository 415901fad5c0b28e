use super::types::DashboardStats;
use super::{ApiClient, DASHBOARD};
use crate::error::Result;
use crate::query::QueryKey;
use reqwest::Method;

impl ApiClient {
    /// Back-office aggregates. Stale after any order, product or user mutation.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        self.queries()
            .fetch(QueryKey::stats(DASHBOARD), || async move {
                self.request(Method::GET, "/dashboard/stats")
                    .execute::<DashboardStats>()
                    .await
            })
            .await
    }
}
