use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use sqlx::SqlitePool;
use subtrack::{
    configuration::get_configuration,
    payments::{CheckoutRequest, CheckoutSession, PaymentError, PaymentGateway, PaymentStatus},
    startup::Application,
    telemetry::{get_subscriber, init_subscriber},
};

// Set TEST_LOG to see the bunyan output of a test run.
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout, None);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink, None);
        init_subscriber(subscriber);
    }
});

/// In-process stand-in for the hosted checkout provider.
#[derive(Debug, Default)]
pub struct FakeGateway {
    sessions: Mutex<HashMap<String, CheckoutSession>>,
    requests: Mutex<Vec<CheckoutRequest>>,
}

impl FakeGateway {
    pub fn mark_paid(&self, session_id: &str) {
        if let Some(session) = self.sessions.lock().unwrap().get_mut(session_id) {
            session.status = PaymentStatus::Paid;
        }
    }

    pub fn insert_session(&self, session: CheckoutSession) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session);
    }

    pub fn last_request(&self) -> Option<CheckoutRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<String, PaymentError> {
        let mut sessions = self.sessions.lock().unwrap();
        let id = format!("cs_test_{}", sessions.len() + 1);
        sessions.insert(
            id.clone(),
            CheckoutSession {
                id: id.clone(),
                status: PaymentStatus::Pending,
                client_reference_id: Some(request.client_reference_id.clone()),
                customer_email: Some(request.customer_email.clone()),
            },
        );
        self.requests.lock().unwrap().push(request.clone());
        Ok(format!("https://checkout.test/pay/{id}"))
    }

    async fn checkout_session(&self, session_id: &str) -> Result<CheckoutSession, PaymentError> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or(PaymentError::Rejected {
                status: 404,
                message: format!("No such checkout.session: {session_id}"),
            })
    }

    async fn billing_portal(&self, _email: &str, _return_url: &str) -> Result<String, PaymentError> {
        Ok("https://billing.test/portal".to_string())
    }
}

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub gateway: Arc<FakeGateway>,
    pub api_client: reqwest::Client,
}

pub struct TestOptions {
    pub free_tier_limit: Option<i64>,
    pub with_gateway: bool,
    pub publishable_key: Option<String>,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            free_tier_limit: Some(5),
            with_gateway: true,
            publishable_key: None,
        }
    }
}

impl TestApp {
    /// A client with its own cookie jar, so several users can share one app.
    pub fn new_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .cookie_store(true)
            .build()
            .unwrap()
    }

    pub async fn post_signup(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_signup_with(&self.api_client, email, password).await
    }

    pub async fn post_signup_with(
        &self,
        client: &reqwest::Client,
        email: &str,
        password: &str,
    ) -> reqwest::Response {
        client
            .post(format!("{}/signup", self.address))
            .form(&[("email", email), ("password", password)])
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_login(&self, email: &str, password: &str) -> reqwest::Response {
        self.api_client
            .post(format!("{}/login", self.address))
            .form(&[("email", email), ("password", password)])
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.get_with(&self.api_client, path).await
    }

    pub async fn get_with(&self, client: &reqwest::Client, path: &str) -> reqwest::Response {
        client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_html(&self, path: &str) -> String {
        self.get(path).await.text().await.unwrap()
    }

    pub async fn post_subscription(&self, name: &str, price: &str, date: &str) -> reqwest::Response {
        self.post_subscription_with(&self.api_client, name, price, date)
            .await
    }

    pub async fn post_subscription_with(
        &self,
        client: &reqwest::Client,
        name: &str,
        price: &str,
        date: &str,
    ) -> reqwest::Response {
        client
            .post(format!("{}/", self.address))
            .form(&[("name", name), ("price", price), ("date", date)])
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_delete(&self, id: i64) -> reqwest::Response {
        self.post_delete_with(&self.api_client, id).await
    }

    pub async fn post_delete_with(&self, client: &reqwest::Client, id: i64) -> reqwest::Response {
        client
            .post(format!("{}/delete/{}", self.address, id))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_checkout(&self) -> reqwest::Response {
        self.api_client
            .post(format!("{}/create-checkout-session", self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn subscription_id(&self, name: &str) -> i64 {
        sqlx::query_scalar("SELECT id FROM subscriptions WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to fetch subscription id.")
    }

    pub async fn subscription_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions")
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count subscriptions.")
    }

    pub async fn is_premium(&self, email: &str) -> bool {
        sqlx::query_scalar("SELECT premium FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to fetch user.")
    }

    /// Signs up a fresh account on the default client and returns its email.
    pub async fn signed_in(&self) -> String {
        let email = format!("{}@example.com", uuid::Uuid::new_v4().simple());
        let response = self.post_signup(&email, "correct horse battery").await;
        assert_is_redirect_to(&response, "/");
        email
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(TestOptions::default()).await
}

pub async fn spawn_app_with(options: TestOptions) -> TestApp {
    Lazy::force(&TRACING);

    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        c.database.url = "sqlite::memory:".to_string();
        c.database.max_connections = 1;
        c.application.port = 0;
        c.application.free_tier_limit = options.free_tier_limit;
        c.application.secure_cookies = false;
        c.application.base_url = "http://127.0.0.1".to_string();
        c.telemetry.otlp_endpoint = None;
        if let Some(payments) = c.payments.as_mut() {
            payments.publishable_key = options.publishable_key.clone().unwrap_or_default();
        }
        c
    };

    let gateway = Arc::new(FakeGateway::default());
    let dyn_gateway = options
        .with_gateway
        .then(|| gateway.clone() as Arc<dyn PaymentGateway>);

    let application = Application::build_with_gateway(configuration, dyn_gateway)
        .await
        .expect("Failed to build application.");
    let port = application.port();
    let pool = application.pool().clone();
    tokio::spawn(application.run_until_stopped());

    let api_client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .cookie_store(true)
        .build()
        .unwrap();

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        pool,
        gateway,
        api_client,
    }
}

pub fn assert_is_redirect_to(response: &reqwest::Response, location: &str) {
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(response.headers().get("Location").unwrap(), location);
}
