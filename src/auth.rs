use axum::extract::FromRef;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    AppState,
    collection::parse_id,
    models::{LoginRequest, RegisterRequest, TokenResponse, UserDocument, UserView},
    repository::{Document, RepositoryState, StoreError},
};

/// Claims
///
/// Payload of the token issued at login. Signed with the server secret (HS256).
/// No route in this service verifies it; it is handed to clients as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Email of the authenticated user.
    pub email: String,
    /// Issued At (iat), seconds since the epoch.
    pub iat: i64,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: i64,
}

/// Errors produced by the credential store.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user already exists")]
    UserAlreadyExists,

    /// Unknown email or wrong password. The two cases are deliberately not distinguished.
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("user not found")]
    UserNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("password hashing task failed: {0}")]
    HashTask(#[from] tokio::task::JoinError),

    /// The configured lifetime pushes the expiry past the representable date range.
    #[error("token lifetime out of range")]
    ExpiryOutOfRange,

    #[error("token signing error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("stored user is malformed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Hashes `password` with bcrypt on the blocking pool. The salt is generated per call.
pub async fn hash_password(password: String, cost: u32) -> Result<String, AuthError> {
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hashed)
}

/// Compares `password` against a stored bcrypt hash on the blocking pool.
pub async fn verify_password(password: String, hash: String) -> Result<bool, AuthError> {
    let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
    Ok(valid)
}

/// Signs a token for `email` that expires `ttl` from now.
pub fn issue_token(email: &str, secret: &str, ttl: Duration) -> Result<TokenResponse, AuthError> {
    let now = Utc::now();
    let expires_at = now
        .checked_add_signed(ttl)
        .ok_or(AuthError::ExpiryOutOfRange)?;
    let claims = Claims {
        email: email.to_string(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(TokenResponse { token, expires_at })
}

/// Decodes and validates a token signed with `secret`, rejecting expired ones.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// CredentialStore
///
/// Registration, login and the read-only user projections, all over the `users`
/// collection. Constructed per request from `AppState` via `FromRef`.
#[derive(Clone)]
pub struct CredentialStore {
    repo: RepositoryState,
    jwt_secret: String,
    token_ttl: Duration,
    bcrypt_cost: u32,
}

impl FromRef<AppState> for CredentialStore {
    fn from_ref(state: &AppState) -> CredentialStore {
        CredentialStore::new(
            state.repo.clone(),
            state.config.jwt_secret.clone(),
            state.config.token_ttl,
            state.config.bcrypt_cost,
        )
    }
}

impl CredentialStore {
    pub const COLLECTION: &'static str = "users";

    pub fn new(repo: RepositoryState, jwt_secret: String, token_ttl: Duration, bcrypt_cost: u32) -> Self {
        Self {
            repo,
            jwt_secret,
            token_ttl,
            bcrypt_cost,
        }
    }

    fn project(doc: Document) -> Result<UserView, AuthError> {
        let user: UserDocument = serde_json::from_value(doc.body)?;
        Ok(UserView {
            id: doc.id,
            name: user.name,
            email: user.email,
        })
    }

    /// register
    ///
    /// Fails with `UserAlreadyExists` when the email is taken. The uniqueness check and the
    /// insert are two separate round trips, so two concurrent registrations for the same
    /// email can both succeed.
    pub async fn register(&self, req: RegisterRequest) -> Result<Uuid, AuthError> {
        if self
            .repo
            .find_one_by_field(Self::COLLECTION, "email", &req.email)
            .await?
            .is_some()
        {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = hash_password(req.password, self.bcrypt_cost).await?;
        let user = UserDocument {
            name: req.name,
            email: req.email,
            password_hash,
        };

        let id = self
            .repo
            .insert_one(Self::COLLECTION, serde_json::to_value(&user)?)
            .await?;
        tracing::info!(user_id = %id, email = %user.email, "user registered");
        Ok(id)
    }

    /// login
    ///
    /// Verifies the password and issues a token. An unknown email still pays for one bcrypt
    /// round so both failure paths take comparable time.
    pub async fn login(&self, req: LoginRequest) -> Result<TokenResponse, AuthError> {
        let Some(doc) = self
            .repo
            .find_one_by_field(Self::COLLECTION, "email", &req.email)
            .await?
        else {
            hash_password(req.password, self.bcrypt_cost).await?;
            return Err(AuthError::InvalidCredentials);
        };

        let user: UserDocument = serde_json::from_value(doc.body)?;
        if !verify_password(req.password, user.password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        tracing::info!(email = %user.email, "login succeeded");
        issue_token(&user.email, &self.jwt_secret, self.token_ttl)
    }

    pub async fn list_users(&self) -> Result<Vec<UserView>, AuthError> {
        self.repo
            .find_all(Self::COLLECTION)
            .await?
            .into_iter()
            .map(Self::project)
            .collect()
    }

    pub async fn get_user(&self, id: &str) -> Result<UserView, AuthError> {
        let id = parse_id(id).ok_or(AuthError::UserNotFound)?;
        let doc = self
            .repo
            .find_by_id(Self::COLLECTION, id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        Self::project(doc)
    }
}
