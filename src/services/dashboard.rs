//! Derived figures shown on the dashboard. Pure functions over a list of
//! subscriptions and a reference date.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;

use crate::models::subscription::SubscriptionModel;

pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Exact sum of all prices. Zero for an empty list. Saturates at
/// `Decimal::MAX` instead of overflowing.
pub fn total_cost(subscriptions: &[SubscriptionModel]) -> Decimal {
    subscriptions
        .iter()
        .fold(Decimal::ZERO, |total, s| total.saturating_add(s.price.amount()))
}

/// Ids of subscriptions renewing within `window_days` of `today`, both ends
/// inclusive. Undated subscriptions are never due.
pub fn due_soon(
    subscriptions: &[SubscriptionModel],
    today: NaiveDate,
    window_days: u32,
) -> BTreeSet<i64> {
    subscriptions
        .iter()
        .filter(|s| is_due_soon(s.renewal_date, today, window_days))
        .map(|s| s.id)
        .collect()
}

fn is_due_soon(renewal_date: Option<NaiveDate>, today: NaiveDate, window_days: u32) -> bool {
    let Some(date) = renewal_date else {
        return false;
    };
    let horizon = today
        .checked_add_days(Days::new(u64::from(window_days)))
        .unwrap_or(NaiveDate::MAX);
    today <= date && date <= horizon
}

#[derive(Debug, Clone)]
pub struct DashboardRow {
    pub subscription: SubscriptionModel,
    pub due_soon: bool,
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub rows: Vec<DashboardRow>,
    pub total: Decimal,
    pub due_soon_names: Vec<String>,
}

impl Dashboard {
    pub fn build(subscriptions: Vec<SubscriptionModel>, today: NaiveDate, window_days: u32) -> Self {
        let total = total_cost(&subscriptions);
        let due = due_soon(&subscriptions, today, window_days);
        let rows: Vec<DashboardRow> = subscriptions
            .into_iter()
            .map(|subscription| DashboardRow {
                due_soon: due.contains(&subscription.id),
                subscription,
            })
            .collect();
        let due_soon_names = rows
            .iter()
            .filter(|row| row.due_soon)
            .map(|row| row.subscription.name.clone())
            .collect();
        Self {
            rows,
            total,
            due_soon_names,
        }
    }

    pub fn formatted_total(&self) -> String {
        format!("{:.2}", self.total)
    }
}
