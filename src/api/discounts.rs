use super::resource::{Discounts, Resource};
use super::types::DiscountSchedule;
use crate::error::{Error, Result};
use reqwest::Method;

impl<'a> Resource<'a, Discounts> {
    /// Cancel a pending or active schedule. The new status comes back from
    /// the backend; it is never computed here.
    pub async fn cancel(&self, schedule: &DiscountSchedule) -> Result<DiscountSchedule> {
        if !schedule.status.is_cancellable() {
            return Err(Error::invalid(
                "status",
                &format!("A {} discount cannot be cancelled", schedule.status),
            ));
        }
        let updated = self
            .api
            .request(Method::PATCH, "/discounts")
            .segments([schedule.id.as_str(), "cancel"])
            .execute::<DiscountSchedule>()
            .await?;
        self.invalidate(Some(&schedule.id));
        Ok(updated)
    }
}
