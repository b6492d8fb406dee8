use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    routing::{get, post},
};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::configuration::{DatabaseSettings, Settings};
use crate::payments::{PaymentGateway, StripeClient};
use crate::routes::{
    auth::{Keys, login_page, login_post, logout_handler, signup_page, signup_post},
    dashboard::index,
    health_check::health_check,
    subscription::{create_subscription, delete_subscription},
    upgrade::{billing_portal, create_checkout_session, upgrade_page, upgrade_success},
};
use crate::services::{
    auth::AuthService, billing::BillingService, subscription::SubscriptionService,
};
use crate::store::{SubscriptionRepository, UserRepository, schema};

#[derive(Clone, Debug)]
pub struct AppState {
    pub auth_service: AuthService,
    pub subscription_service: SubscriptionService,
    pub billing_service: BillingService,
    pub keys: Arc<Keys>,
    pub due_soon_window_days: u32,
    pub free_tier_limit: Option<i64>,
    /// Handed to the browser on the upgrade page for client-side checkout.
    pub publishable_key: Option<String>,
}

impl FromRef<AppState> for Arc<Keys> {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    pool: SqlitePool,
}

impl Application {
    /// Wires the app with the Stripe gateway when `payments` is configured.
    pub async fn build(settings: Settings) -> anyhow::Result<Self> {
        let gateway = match settings.payments.as_ref().filter(|p| p.is_configured()) {
            Some(payments) => {
                Some(Arc::new(StripeClient::new(payments)?) as Arc<dyn PaymentGateway>)
            }
            None => {
                tracing::warn!("Payment provider keys missing; upgrades are disabled");
                None
            }
        };
        Self::build_with_gateway(settings, gateway).await
    }

    pub async fn build_with_gateway(
        settings: Settings,
        gateway: Option<Arc<dyn PaymentGateway>>,
    ) -> anyhow::Result<Self> {
        let pool = get_connection_pool(&settings.database).await?;
        schema::run_migrations(&pool).await?;

        let app = &settings.application;
        let publishable_key = settings
            .payments
            .as_ref()
            .map(|p| p.publishable_key.trim())
            .filter(|key| !key.is_empty())
            .map(String::from);
        let user_repo = UserRepository::new(pool.clone());
        let state = AppState {
            auth_service: AuthService::new(user_repo.clone()),
            subscription_service: SubscriptionService::new(
                SubscriptionRepository::new(pool.clone()),
                app.free_tier_limit,
            ),
            billing_service: BillingService::new(user_repo, gateway, &app.base_url),
            keys: Arc::new(Keys::from_settings(app)),
            due_soon_window_days: app.due_soon_window_days,
            free_tier_limit: app.free_tier_limit,
            publishable_key,
        };

        let listener = TcpListener::bind((app.host.as_str(), app.port)).await?;
        let port = listener.local_addr()?.port();
        tracing::info!(port, "Listening");

        Ok(Self {
            port,
            listener,
            router: router(state),
            pool,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router).await
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index).post(create_subscription))
        .route("/delete/{id}", post(delete_subscription))
        .route("/signup", get(signup_page).post(signup_post))
        .route("/login", get(login_page).post(login_post))
        .route("/logout", get(logout_handler))
        .route("/upgrade", get(upgrade_page))
        .route("/create-checkout-session", post(create_checkout_session))
        .route("/upgrade/success", get(upgrade_success))
        .route("/billing", get(billing_portal))
        .route("/health_check", get(health_check))
        .nest_service("/assets", ServeDir::new("public"))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn get_connection_pool(settings: &DatabaseSettings) -> anyhow::Result<SqlitePool> {
    let options = settings.connect_options()?;
    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    // Connections are never recycled: an in-memory database lives only as long
    // as one of them stays open.
    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect_with(options)
        .await?;
    Ok(pool)
}
