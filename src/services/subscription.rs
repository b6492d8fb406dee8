use tracing::instrument;
use uuid::Uuid;

use crate::{
    domain::NewSubscription,
    errors::SubscriptionError,
    models::subscription::SubscriptionModel,
    store::{InsertOutcome, SubscriptionRepository},
};

#[derive(Clone, Debug)]
pub struct SubscriptionService {
    repo: SubscriptionRepository,
    free_tier_limit: Option<i64>,
}

impl SubscriptionService {
    /// `free_tier_limit` of `None` disables the quota entirely.
    pub fn new(repo: SubscriptionRepository, free_tier_limit: Option<i64>) -> Self {
        Self {
            repo,
            free_tier_limit,
        }
    }

    #[instrument(name = "Service: Add subscription", skip(self, new), fields(name = %new.name.as_ref()))]
    pub async fn add(
        &self,
        owner: Uuid,
        new: NewSubscription,
    ) -> Result<SubscriptionModel, SubscriptionError> {
        match self.repo.insert(owner, &new, self.free_tier_limit).await? {
            InsertOutcome::Inserted(subscription) => Ok(subscription),
            InsertOutcome::QuotaReached { limit } => {
                tracing::info!(limit, "Free tier limit reached");
                Err(SubscriptionError::QuotaExceeded { limit })
            }
        }
    }

    pub async fn list_for_owner(
        &self,
        owner: Uuid,
    ) -> Result<Vec<SubscriptionModel>, SubscriptionError> {
        Ok(self.repo.list_by_owner(owner).await?)
    }

    /// A subscription owned by someone else is reported as missing.
    #[instrument(name = "Service: Delete subscription", skip(self))]
    pub async fn delete(&self, owner: Uuid, id: i64) -> Result<(), SubscriptionError> {
        if self.repo.delete_owned(owner, id).await? {
            Ok(())
        } else {
            tracing::warn!("Delete of missing or foreign subscription");
            Err(SubscriptionError::NotFound)
        }
    }
}
