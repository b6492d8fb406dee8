use crate::{
    domain::UserEmail, errors::AuthError, models::user::UserModel, store::user::UserRepository,
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;
use uuid::Uuid;

// Verified against when the email is unknown so both failure paths cost the
// same amount of work.
const DUMMY_HASH: &str = "$argon2id$v=19$m=15000,t=2,p=1$gZiV/M1gPc22ElAH/Jh1Hw$CWOrkoo7oJBQ/iyh7uJ0LO2aLEfrHwTWllSAxT0zRno";

#[derive(Clone, Debug)]
pub struct AuthService {
    repo: UserRepository,
}

impl AuthService {
    pub fn new(repo: UserRepository) -> Self {
        Self { repo }
    }

    #[instrument(name = "AuthService: Register", skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<UserModel, AuthError> {
        let email = UserEmail::parse(email).map_err(|_| AuthError::MissingCredentials)?;
        if password.expose_secret().is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        if self.repo.find_by_email(&email).await?.is_some() {
            tracing::warn!("Signup rejected: email already registered");
            return Err(AuthError::DuplicateEmail);
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.expose_secret().as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?
            .to_string();

        // A concurrent signup can still win the race past the check above.
        self.repo
            .create_user(&email, &hash)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AuthError::DuplicateEmail
                } else {
                    AuthError::Unexpected(e)
                }
            })
    }

    #[instrument(
        name = "AuthService: Login attempt",
        skip(self, password),
        fields(user_email = %email)
    )]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<UserModel, AuthError> {
        let user = match UserEmail::parse(email) {
            Ok(email) => self.repo.find_by_email(&email).await.map_err(|e| {
                tracing::error!("Database error during login: {:?}", e);
                AuthError::Unexpected(e)
            })?,
            Err(_) => None,
        };

        let (stored_hash, user) = match user {
            Some(u) => (u.password_hash.clone(), Some(u)),
            None => (DUMMY_HASH.to_string(), None),
        };

        let parsed_hash = PasswordHash::new(&stored_hash).map_err(|e| {
            tracing::error!("Critical: Failed to parse password hash from DB: {:?}", e);
            anyhow::anyhow!("stored password hash is malformed")
        })?;

        let verified = Argon2::default()
            .verify_password(password.expose_secret().as_bytes(), &parsed_hash)
            .is_ok();

        match user {
            Some(user) if verified => {
                tracing::info!("User authenticated successfully");
                Ok(user)
            }
            Some(_) => {
                tracing::warn!("Login failed: Invalid password provided");
                Err(AuthError::InvalidCredentials)
            }
            None => {
                tracing::warn!("Login failed: User not found");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    pub async fn find_user(&self, id: Uuid) -> Result<Option<UserModel>, AuthError> {
        Ok(self.repo.find_by_id(id).await?)
    }
}

fn is_unique_violation(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .is_some_and(|db| db.is_unique_violation())
}
