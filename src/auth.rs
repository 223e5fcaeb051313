use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    access,
    config::AppConfig,
    errors::AppError,
    models::{Role, User},
    repository::RepositoryState,
};

/// Claims
///
/// Payload of an access token. The subject is the username; the user's id and
/// role are re-read from the database on every request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the username the token was issued to.
    pub sub: String,
    /// Expiration Time (exp): seconds since the epoch.
    pub exp: usize,
    /// Issued At (iat): seconds since the epoch.
    pub iat: usize,
}

/// AuthUser
///
/// The resolved principal of an authenticated request.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

/// issue_token
///
/// Signs a token for `username` that expires after the configured window.
pub fn issue_token(username: &str, config: &AppConfig) -> Result<String, AppError> {
    let ttl = Duration::try_minutes(config.token_ttl_minutes)
        .filter(|ttl| *ttl > Duration::zero())
        .ok_or_else(|| {
            AppError::Internal(format!(
                "Invalid token lifetime: {} minutes",
                config.token_ttl_minutes
            ))
        })?;

    let now = Utc::now();
    let claims = Claims {
        sub: username.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + ttl).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to issue token: {}", e)))
}

/// decode_token
///
/// Verifies signature and expiry. Every failure collapses into one 401 so callers
/// cannot tell a forged token from an expired one.
pub fn decode_token(token: &str, config: &AppConfig) -> Result<Claims, AppError> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => Ok(data.claims),
        Err(e) => {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
                other => tracing::debug!("rejected token: {:?}", other),
            }
            Err(invalid_credentials())
        }
    }
}

/// The credentials of an `Authorization` value whose scheme is `Bearer`, in any case.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Could not validate credentials".to_string())
}

/// AuthUser Extractor Implementation
///
/// 1. Reads `Authorization: Bearer <token>`.
/// 2. Decodes and validates the JWT.
/// 3. Loads the user named by `sub`, so a deleted user's token stops working.
///
/// Rejection: 401 with `WWW-Authenticate: Bearer` on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;

        let claims = decode_token(token, &config)?;

        let stored = repo
            .get_user_by_username(&claims.sub)
            .await?
            .ok_or_else(invalid_credentials)?;

        Ok(AuthUser::from(stored.user))
    }
}

/// AdminUser
///
/// An `AuthUser` whose role has been checked to be `admin`.
/// Rejection: 401 as for `AuthUser`, then 403 for non-admins.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        access::ensure_admin(&user)?;
        Ok(AdminUser(user))
    }
}
