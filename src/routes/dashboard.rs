use crate::{
    errors::AppError,
    routes::flash::{self, FlashMessage},
    services::dashboard::Dashboard,
    startup::AppState,
};
use askama::Template;
use axum::{
    extract::State,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::{CookieJar, cookie::Cookie};
use tracing::instrument;

use super::auth::SESSION_COOKIE;

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    email: String,
    premium: bool,
    flash: Option<FlashMessage>,
    dashboard: Dashboard,
    free_tier_limit: Option<i64>,
}

#[derive(Template)]
#[template(path = "landing.html")]
struct LandingTemplate {
    flash: Option<FlashMessage>,
}

/// The dashboard for signed-in users, the landing page for everyone else.
#[instrument(name = "Web: Dashboard", skip(state, jar))]
pub async fn index(State(state): State<AppState>, jar: CookieJar) -> Result<Response, AppError> {
    let (jar, flash) = flash::take(jar);

    let user = match state.keys.claims_from_jar(&jar) {
        Some(claims) => state.auth_service.find_user(claims.sub).await?,
        None => None,
    };
    let Some(user) = user else {
        // A stale cookie for a user that no longer exists is dropped.
        let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
        let page = LandingTemplate { flash }.render()?;
        return Ok((jar, Html(page)).into_response());
    };

    let subscriptions = state.subscription_service.list_for_owner(user.id).await?;
    let today = chrono::Utc::now().date_naive();
    let dashboard = Dashboard::build(subscriptions, today, state.due_soon_window_days);

    let template = DashboardTemplate {
        email: user.email,
        premium: user.premium,
        flash,
        dashboard,
        free_tier_limit: state.free_tier_limit,
    };
    Ok((jar, Html(template.render()?)).into_response())
}
