use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::instrument;

use super::{CheckoutRequest, CheckoutSession, PaymentError, PaymentGateway, PaymentStatus};
use crate::configuration::PaymentSettings;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Talks to the Stripe REST API with form-encoded requests.
#[derive(Debug)]
pub struct StripeClient {
    http: Client,
    api_base: String,
    secret_key: SecretString,
    price_id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Deserialize)]
struct RawCheckoutSession {
    id: String,
    url: Option<String>,
    payment_status: Option<String>,
    client_reference_id: Option<String>,
    customer_email: Option<String>,
    customer_details: Option<CustomerDetails>,
}

#[derive(Deserialize)]
struct CustomerDetails {
    email: Option<String>,
}

#[derive(Deserialize)]
struct Customer {
    id: String,
}

#[derive(Deserialize)]
struct CustomerList {
    data: Vec<Customer>,
}

#[derive(Deserialize)]
struct PortalSession {
    url: String,
}

impl From<RawCheckoutSession> for CheckoutSession {
    fn from(raw: RawCheckoutSession) -> Self {
        let status = match raw.payment_status.as_deref() {
            Some("paid") => PaymentStatus::Paid,
            _ => PaymentStatus::Pending,
        };
        let customer_email = raw
            .customer_email
            .or_else(|| raw.customer_details.and_then(|d| d.email));
        Self {
            id: raw.id,
            status,
            client_reference_id: raw.client_reference_id,
            customer_email,
        }
    }
}

fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 255
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl StripeClient {
    pub fn new(settings: &PaymentSettings) -> Result<Self, PaymentError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            secret_key: settings.secret_key.expose_secret().to_string().into(),
            price_id: settings.price_id.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.api_base, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, PaymentError> {
        let response = request
            .basic_auth(self.secret_key.expose_secret(), None::<&str>)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorEnvelope>()
                .await
                .ok()
                .and_then(|envelope| envelope.error.message)
                .unwrap_or_else(|| "no error message".to_string());
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<T>().await?)
    }

    async fn find_or_create_customer(&self, email: &str) -> Result<String, PaymentError> {
        let existing: CustomerList = self
            .send(
                self.http
                    .get(self.endpoint("customers"))
                    .query(&[("email", email), ("limit", "1")]),
            )
            .await?;
        if let Some(customer) = existing.data.into_iter().next() {
            return Ok(customer.id);
        }

        tracing::info!("Creating payment customer");
        let created: Customer = self
            .send(
                self.http
                    .post(self.endpoint("customers"))
                    .form(&[("email", email)]),
            )
            .await?;
        Ok(created.id)
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    #[instrument(name = "Stripe: Create checkout session", skip(self, request))]
    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<String, PaymentError> {
        let params = [
            ("mode", "subscription"),
            ("payment_method_types[0]", "card"),
            ("line_items[0][price]", self.price_id.as_str()),
            ("line_items[0][quantity]", "1"),
            ("success_url", request.success_url.as_str()),
            ("cancel_url", request.cancel_url.as_str()),
            ("customer_email", request.customer_email.as_str()),
            ("client_reference_id", request.client_reference_id.as_str()),
        ];
        let session: RawCheckoutSession = self
            .send(
                self.http
                    .post(self.endpoint("checkout/sessions"))
                    .form(&params),
            )
            .await?;
        session.url.ok_or(PaymentError::MissingField("url"))
    }

    #[instrument(name = "Stripe: Retrieve checkout session", skip(self))]
    async fn checkout_session(&self, session_id: &str) -> Result<CheckoutSession, PaymentError> {
        if !is_valid_session_id(session_id) {
            return Err(PaymentError::InvalidSessionId);
        }
        let session: RawCheckoutSession = self
            .send(
                self.http
                    .get(self.endpoint(&format!("checkout/sessions/{session_id}"))),
            )
            .await?;
        Ok(session.into())
    }

    #[instrument(name = "Stripe: Open billing portal", skip(self, email))]
    async fn billing_portal(&self, email: &str, return_url: &str) -> Result<String, PaymentError> {
        let customer = self.find_or_create_customer(email).await?;
        let portal: PortalSession = self
            .send(
                self.http
                    .post(self.endpoint("billing_portal/sessions"))
                    .form(&[("customer", customer.as_str()), ("return_url", return_url)]),
            )
            .await?;
        Ok(portal.url)
    }
}
