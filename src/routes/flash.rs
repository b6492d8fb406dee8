//! One-shot messages that survive a redirect.
//!
//! The message rides in a `flash` cookie and is removed by the next page that
//! renders it.

use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use url::form_urlencoded;

const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Warning,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Info => "info",
            Level::Warning => "warning",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "success" => Some(Level::Success),
            "info" => Some(Level::Info),
            "warning" => Some(Level::Warning),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashMessage {
    pub level: Level,
    pub text: String,
}

impl FlashMessage {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: Level::Warning,
            text: text.into(),
        }
    }

    fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("level", self.level.as_str())
            .append_pair("text", &self.text)
            .finish()
    }

    fn decode(raw: &str) -> Option<Self> {
        let mut level = None;
        let mut text = None;
        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "level" => level = Level::parse(&value),
                "text" => text = Some(value.into_owned()),
                _ => {}
            }
        }
        Some(Self {
            level: level?,
            text: text?,
        })
    }
}

pub fn push(jar: CookieJar, message: &FlashMessage) -> CookieJar {
    let cookie = Cookie::build((FLASH_COOKIE, message.encode()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    jar.add(cookie)
}

/// Reads the pending message, if any, and schedules its removal.
pub fn take(jar: CookieJar) -> (CookieJar, Option<FlashMessage>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, None);
    };
    let message = FlashMessage::decode(cookie.value());
    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), message)
}

/// Redirects to `to`, showing `message` on arrival.
pub fn redirect(message: FlashMessage, to: &str) -> Response {
    redirect_with(CookieJar::new(), message, to)
}

pub fn redirect_with(jar: CookieJar, message: FlashMessage, to: &str) -> Response {
    (push(jar, &message), Redirect::to(to)).into_response()
}
