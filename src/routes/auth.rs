use std::fmt;
use std::sync::Arc;

use askama::Template;
use axum::extract::{FromRef, FromRequestParts, State};
use axum::http::request::Parts;
use axum::response::{Html, IntoResponse, Response};
use axum::{Form, RequestPartsExt};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::configuration::ApplicationSettings;
use crate::errors::{AppError, AuthError};
use crate::routes::flash::{self, FlashMessage};
use crate::startup::AppState;

pub const SESSION_COOKIE: &str = "jwt";

#[derive(Template)]
#[template(path = "signup.html")]
struct SignupTemplate {
    flash: Option<FlashMessage>,
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    flash: Option<FlashMessage>,
}

/// Absent fields arrive empty and are rejected by the auth service.
#[derive(Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    email: String,
    #[serde(default = "empty_password")]
    password: SecretString,
}

fn empty_password() -> SecretString {
    SecretString::from(String::new())
}

pub async fn signup_page(jar: CookieJar) -> Result<impl IntoResponse, AppError> {
    let (jar, flash) = flash::take(jar);
    Ok((jar, Html(SignupTemplate { flash }.render()?)))
}

pub async fn login_page(jar: CookieJar) -> Result<impl IntoResponse, AppError> {
    let (jar, flash) = flash::take(jar);
    Ok((jar, Html(LoginTemplate { flash }.render()?)))
}

#[instrument(name = "Web: Signup POST", skip(state, jar, form))]
pub async fn signup_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AuthError> {
    let user = state
        .auth_service
        .register(&form.email, &form.password)
        .await?;

    let token = state.keys.issue(user.id)?;
    tracing::info!(user_id = %user.id, "Account created");
    Ok(flash::redirect_with(
        jar.add(state.keys.session_cookie(token)),
        FlashMessage::success("Account created. You're now logged in."),
        "/",
    ))
}

#[instrument(name = "Web: Login POST", skip(state, jar, form))]
pub async fn login_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AuthError> {
    tracing::info!("Request to login user recieved!");
    let user = state
        .auth_service
        .authenticate(&form.email, &form.password)
        .await?;

    let token = state.keys.issue(user.id)?;
    Ok(flash::redirect_with(
        jar.add(state.keys.session_cookie(token)),
        FlashMessage::success("Logged in"),
        "/",
    ))
}

#[instrument(name = "Web: Logout GET", skip(jar, claims), fields(user_id = %claims.sub))]
pub async fn logout_handler(claims: Claims, jar: CookieJar) -> Response {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    flash::redirect_with(jar, FlashMessage::info("Logged out"), "/login")
}

/// Signing material and cookie policy for session tokens.
#[derive(Clone)]
pub struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: chrono::Duration,
    secure_cookies: bool,
}

impl Keys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: chrono::Duration::hours(24),
            secure_cookies: false,
        }
    }

    pub fn from_settings(settings: &ApplicationSettings) -> Self {
        Self {
            ttl: chrono::Duration::hours(settings.session_ttl_hours),
            secure_cookies: settings.secure_cookies,
            ..Self::new(settings.secret_key.expose_secret().as_bytes())
        }
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user_id,
            exp: (chrono::Utc::now() + self.ttl).timestamp() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|e| {
            tracing::error!("JWT Encoding failed: {:?}", e);
            AuthError::TokenCreation
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::warn!("JWT decoding failed: {:?}", e);
                AuthError::InvalidToken
            })
    }

    /// Claims from the session cookie, if it carries a valid token.
    pub fn claims_from_jar(&self, jar: &CookieJar) -> Option<Claims> {
        let token = jar.get(SESSION_COOKIE)?;
        self.verify(token.value()).ok()
    }

    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .secure(self.secure_cookies)
            .same_site(SameSite::Lax)
            .build()
    }
}

impl fmt::Debug for Keys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keys")
            .field("ttl", &self.ttl)
            .field("secure_cookies", &self.secure_cookies)
            .finish_non_exhaustive()
    }
}

/// The authenticated identity. Handlers take it as an argument and pass
/// `sub` on to every service call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

impl<S> FromRequestParts<S> for Claims
where
    Arc<Keys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    #[instrument(name = "Extracting Claims", skip(state, parts))]
    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = Arc::<Keys>::from_ref(state);
        let jar = parts
            .extract::<CookieJar>()
            .await
            .map_err(|_| AuthError::InvalidToken)?;
        let token = jar.get(SESSION_COOKIE).ok_or_else(|| {
            tracing::debug!("No session cookie present");
            AuthError::InvalidToken
        })?;
        keys.verify(token.value())
    }
}
