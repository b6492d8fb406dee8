//! Hosted checkout provider. Card handling and payment collection happen on
//! the provider's pages; this crate only creates sessions and reads their
//! outcome with the server-side secret key.

mod stripe;

pub use stripe::StripeClient;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("request to payment provider failed")]
    Transport(#[from] reqwest::Error),

    #[error("payment provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("payment provider response is missing `{0}`")]
    MissingField(&'static str),

    #[error("malformed checkout session id")]
    InvalidSessionId,
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub customer_email: String,
    /// Our user id, echoed back by the provider so a session can be tied to
    /// the account that started it.
    pub client_reference_id: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Paid,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub status: PaymentStatus,
    pub client_reference_id: Option<String>,
    pub customer_email: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync + std::fmt::Debug {
    /// Creates a hosted checkout session and returns the URL to send the user to.
    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<String, PaymentError>;

    /// Looks a checkout session up directly with the provider.
    async fn checkout_session(&self, session_id: &str) -> Result<CheckoutSession, PaymentError>;

    /// Opens a self-service billing portal for the customer with `email`.
    async fn billing_portal(&self, email: &str, return_url: &str) -> Result<String, PaymentError>;
}
