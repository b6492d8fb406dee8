use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use thiserror::Error;

use crate::{
    domain::ValidationError,
    payments::PaymentError,
    routes::{
        auth::SESSION_COOKIE,
        flash::{self, FlashMessage},
    },
};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User already exists")]
    DuplicateEmail,

    #[error("Wrong credentials")]
    InvalidCredentials,

    #[error("Missing credentials")]
    MissingCredentials,

    #[error("Token creation error")]
    TokenCreation,

    #[error("Invalid token")]
    InvalidToken,

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Subscription not found")]
    NotFound,

    #[error("Free tier limit of {limit} subscriptions reached")]
    QuotaExceeded { limit: i64 },

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Payments are not configured")]
    NotConfigured,

    #[error("Account is already premium")]
    AlreadyPremium,

    #[error("Checkout session id is missing")]
    MissingSession,

    #[error("Payment has not completed yet")]
    PaymentPending,

    #[error("Checkout session belongs to another account")]
    SessionMismatch,

    #[error("Payment provider error")]
    Upstream(#[source] PaymentError),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// Everything a handler can fail with.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Subscription(#[from] SubscriptionError),

    #[error(transparent)]
    Billing(#[from] BillingError),

    #[error("Failed to render template")]
    Render(#[from] askama::Error),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate {
    message: &'static str,
}

fn internal_error(error: &dyn std::error::Error) -> Response {
    tracing::error!(error = %error, source = ?error.source(), "Request failed");
    let message = "An unexpected error occurred";
    let body = ErrorTemplate { message }
        .render()
        .unwrap_or_else(|_| message.to_string());
    (StatusCode::INTERNAL_SERVER_ERROR, Html(body)).into_response()
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::DuplicateEmail => flash::redirect(
                FlashMessage::warning("Email already registered. Try logging in."),
                "/login",
            ),
            AuthError::InvalidCredentials => flash::redirect(
                FlashMessage::warning("Invalid email or password"),
                "/login",
            ),
            AuthError::MissingCredentials => flash::redirect(
                FlashMessage::warning("Email and password are required."),
                "/signup",
            ),
            AuthError::InvalidToken => {
                let jar = CookieJar::new().remove(Cookie::build(SESSION_COOKIE).path("/"));
                (
                    flash::push(jar, &FlashMessage::info("Please log in to continue.")),
                    Redirect::to("/login"),
                )
                    .into_response()
            }
            AuthError::TokenCreation | AuthError::Unexpected(_) => internal_error(&self),
        }
    }
}

impl IntoResponse for SubscriptionError {
    fn into_response(self) -> Response {
        let message = match &self {
            SubscriptionError::Validation(e) => FlashMessage::warning(e.to_string()),
            SubscriptionError::NotFound => FlashMessage::warning("Subscription not found."),
            SubscriptionError::QuotaExceeded { limit } => FlashMessage::warning(format!(
                "Free limit reached ({limit}). Upgrade to Premium for unlimited subscriptions."
            )),
            SubscriptionError::Unexpected(_) => return internal_error(&self),
        };
        flash::redirect(message, "/")
    }
}

impl IntoResponse for BillingError {
    fn into_response(self) -> Response {
        let (message, to) = match &self {
            BillingError::NotConfigured => (
                FlashMessage::warning("Payment is not configured yet."),
                "/upgrade",
            ),
            BillingError::AlreadyPremium => (FlashMessage::info("You're already Premium."), "/"),
            BillingError::MissingSession => {
                (FlashMessage::warning("Missing session id."), "/upgrade")
            }
            BillingError::PaymentPending => {
                (FlashMessage::warning("Payment not completed yet."), "/")
            }
            BillingError::SessionMismatch => {
                tracing::warn!("Checkout session does not belong to the current user");
                (FlashMessage::warning("Could not verify payment."), "/")
            }
            BillingError::Upstream(e) => {
                // Provider messages can leak account details; log them only.
                tracing::error!(error = ?e, "Payment provider call failed");
                (
                    FlashMessage::warning(
                        "The payment provider could not be reached. Please try again later.",
                    ),
                    "/",
                )
            }
            BillingError::Unexpected(_) => return internal_error(&self),
        };
        flash::redirect(message, to)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Auth(e) => e.into_response(),
            AppError::Subscription(e) => e.into_response(),
            AppError::Billing(e) => e.into_response(),
            AppError::Render(_) | AppError::Unexpected(_) => internal_error(&self),
        }
    }
}
