use axum::{
    Form,
    extract::{Path, State},
    response::Response,
};
use tracing::instrument;

use crate::{
    domain::{NewSubscription, SubscriptionForm},
    errors::SubscriptionError,
    routes::{
        auth::Claims,
        flash::{self, FlashMessage},
    },
    startup::AppState,
};

#[instrument(
    name = "Web: Create subscription",
    skip(state, claims, form),
    fields(user_id = %claims.sub)
)]
pub async fn create_subscription(
    State(state): State<AppState>,
    claims: Claims,
    Form(form): Form<SubscriptionForm>,
) -> Result<Response, SubscriptionError> {
    let new = NewSubscription::try_from(form)?;
    let subscription = state.subscription_service.add(claims.sub, new).await?;

    Ok(flash::redirect(
        FlashMessage::success(format!("Added subscription: {}", subscription.name)),
        "/",
    ))
}

#[instrument(
    name = "Web: Delete subscription",
    skip(state, claims),
    fields(user_id = %claims.sub)
)]
pub async fn delete_subscription(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<String>,
) -> Result<Response, SubscriptionError> {
    // A malformed id cannot name any row.
    let id: i64 = id.parse().map_err(|_| SubscriptionError::NotFound)?;
    state.subscription_service.delete(claims.sub, id).await?;
    Ok(flash::redirect(FlashMessage::info("Subscription deleted"), "/"))
}
