use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::{
    errors::BillingError,
    models::user::UserModel,
    payments::{CheckoutRequest, PaymentGateway, PaymentStatus},
    store::UserRepository,
};

/// Premium upgrade through the hosted checkout. Without a gateway every
/// payment operation reports [`BillingError::NotConfigured`].
#[derive(Clone, Debug)]
pub struct BillingService {
    users: UserRepository,
    gateway: Option<Arc<dyn PaymentGateway>>,
    base_url: String,
}

impl BillingService {
    pub fn new(
        users: UserRepository,
        gateway: Option<Arc<dyn PaymentGateway>>,
        base_url: &str,
    ) -> Self {
        Self {
            users,
            gateway,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn gateway(&self) -> Result<&dyn PaymentGateway, BillingError> {
        self.gateway.as_deref().ok_or_else(|| {
            tracing::warn!("Payment operation attempted without a configured provider");
            BillingError::NotConfigured
        })
    }

    async fn user(&self, user_id: Uuid) -> Result<UserModel, BillingError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("user {user_id} does not exist").into())
    }

    #[instrument(name = "Billing: Start checkout", skip(self))]
    pub async fn start_checkout(&self, user_id: Uuid) -> Result<String, BillingError> {
        let user = self.user(user_id).await?;
        if user.premium {
            return Err(BillingError::AlreadyPremium);
        }
        let gateway = self.gateway()?;

        let request = CheckoutRequest {
            customer_email: user.email,
            client_reference_id: user.id.to_string(),
            success_url: format!(
                "{}/upgrade/success?session_id={{CHECKOUT_SESSION_ID}}",
                self.base_url
            ),
            cancel_url: format!("{}/upgrade", self.base_url),
        };
        gateway
            .create_checkout(&request)
            .await
            .map_err(BillingError::Upstream)
    }

    /// Asks the provider, not the browser, whether the session was paid, and
    /// only accepts sessions started by `user_id`.
    #[instrument(name = "Billing: Confirm upgrade", skip(self))]
    pub async fn confirm_upgrade(
        &self,
        user_id: Uuid,
        session_id: Option<&str>,
    ) -> Result<(), BillingError> {
        let session_id = session_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(BillingError::MissingSession)?;
        let gateway = self.gateway()?;

        let session = gateway
            .checkout_session(session_id)
            .await
            .map_err(BillingError::Upstream)?;

        let owner = user_id.to_string();
        if session.client_reference_id.as_deref() != Some(owner.as_str()) {
            return Err(BillingError::SessionMismatch);
        }

        match session.status {
            PaymentStatus::Paid => self.mark_premium(user_id).await,
            PaymentStatus::Pending => Err(BillingError::PaymentPending),
        }
    }

    /// Idempotent: flagging an already premium account is a no-op.
    #[instrument(name = "Billing: Mark premium", skip(self))]
    pub async fn mark_premium(&self, user_id: Uuid) -> Result<(), BillingError> {
        if !self.users.set_premium(user_id).await? {
            return Err(anyhow::anyhow!("user {user_id} does not exist").into());
        }
        tracing::info!("Account upgraded to premium");
        Ok(())
    }

    #[instrument(name = "Billing: Open portal", skip(self))]
    pub async fn billing_portal(&self, user_id: Uuid) -> Result<String, BillingError> {
        let user = self.user(user_id).await?;
        let gateway = self.gateway()?;
        gateway
            .billing_portal(&user.email, &format!("{}/", self.base_url))
            .await
            .map_err(BillingError::Upstream)
    }
}
