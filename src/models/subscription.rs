use chrono::{DateTime, NaiveDate, Utc};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::domain::Price;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct SubscriptionModel {
    pub id: i64,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub price: Price,
    pub renewal_date: Option<NaiveDate>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}
