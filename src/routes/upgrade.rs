use askama::Template;
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use tracing::instrument;

use crate::{
    errors::{AppError, AuthError, BillingError},
    routes::{
        auth::Claims,
        flash::{self, FlashMessage},
    },
    startup::AppState,
};

#[derive(Template)]
#[template(path = "upgrade.html")]
struct UpgradeTemplate {
    flash: Option<FlashMessage>,
    free_tier_limit: Option<i64>,
    publishable_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SuccessParams {
    session_id: Option<String>,
}

#[instrument(name = "Web: Upgrade page", skip(state, claims, jar), fields(user_id = %claims.sub))]
pub async fn upgrade_page(
    State(state): State<AppState>,
    claims: Claims,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let user = state
        .auth_service
        .find_user(claims.sub)
        .await?
        .ok_or(AuthError::InvalidToken)?;
    if user.premium {
        return Ok(BillingError::AlreadyPremium.into_response());
    }

    let (jar, flash) = flash::take(jar);
    let template = UpgradeTemplate {
        flash,
        free_tier_limit: state.free_tier_limit,
        publishable_key: state.publishable_key.clone(),
    };
    Ok((jar, Html(template.render()?)).into_response())
}

#[instrument(name = "Web: Create checkout session", skip(state, claims), fields(user_id = %claims.sub))]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Redirect, BillingError> {
    let url = state.billing_service.start_checkout(claims.sub).await?;
    Ok(Redirect::to(&url))
}

#[instrument(name = "Web: Upgrade success", skip(state, claims), fields(user_id = %claims.sub))]
pub async fn upgrade_success(
    State(state): State<AppState>,
    claims: Claims,
    Query(params): Query<SuccessParams>,
) -> Result<Response, BillingError> {
    state
        .billing_service
        .confirm_upgrade(claims.sub, params.session_id.as_deref())
        .await?;
    Ok(flash::redirect(
        FlashMessage::success("Upgrade successful! Your account is now Premium."),
        "/",
    ))
}

#[instrument(name = "Web: Billing portal", skip(state, claims), fields(user_id = %claims.sub))]
pub async fn billing_portal(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Redirect, BillingError> {
    let url = state.billing_service.billing_portal(claims.sub).await?;
    Ok(Redirect::to(&url))
}
