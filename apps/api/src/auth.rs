//! # Authentication
//!
//! JWT issuing and validation, the bearer-token middleware and role checks.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  POST /api/v1/auth/login ──► authenticate() ──► JwtManager::issue()     │
//! │                                                      │                  │
//! │                         { "token": "eyJ..." } ◄──────┘                  │
//! │                                                                         │
//! │  GET /api/v1/... + Authorization: Bearer eyJ...                         │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  require_auth                                                           │
//! │      ├─ no/garbled header  ──────────► 401 UNAUTHORIZED                 │
//! │      ├─ bad signature / expired ─────► 401 UNAUTHORIZED                 │
//! │      ├─ user gone or deactivated ────► 401 UNAUTHORIZED                 │
//! │      └─ ok: Principal in request extensions                             │
//! │              │                                                          │
//! │              ▼                                                          │
//! │  handler ── authorize(&principal, Action) ── 403 FORBIDDEN if denied    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::{Request, State};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use pdv_core::{Action, Role, User};
use pdv_db::password::verify_password;
use pdv_db::{Database, DbError};

use crate::error::{ApiError, ErrorCode};
use crate::state::AppState;

/// `iss` claim written into and required from every token.
pub const TOKEN_ISSUER: &str = "pdv-api";

// =============================================================================
// Tokens
// =============================================================================

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    pub email: String,

    pub role: Role,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    pub iss: String,
}

/// JWT token manager (HS256).
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: &str, lifetime_secs: i64) -> Self {
        JwtManager {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime_secs,
        }
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    /// Signs a token for `user`.
    pub fn issue(&self, user: &User) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: TOKEN_ISSUER.to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            tracing::error!("Failed to generate token: {}", e);
            ApiError::persistence()
        })
    }

    /// Checks signature, expiry and issuer.
    pub fn validate(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Token rejected: {}", e);
                ApiError::unauthorized("Invalid or expired token")
            })
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn bearer_from_headers(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(extract_bearer_token)
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))
}

// =============================================================================
// Principal & Middleware
// =============================================================================

/// The authenticated caller, as loaded from the database on this request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Principal {
            user_id: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Validates the bearer token and places a [`Principal`] in the request.
///
/// The role is read from the database rather than the token, so demoting
/// or deactivating a user takes effect on their next request.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = state.jwt.validate(bearer_from_headers(req.headers())?)?;

    let user = state
        .db
        .users()
        .get_by_id(&claims.sub)
        .await?
        .filter(|user| user.active)
        .ok_or_else(|| {
            warn!(user_id = %claims.sub, "Token for missing or inactive user");
            ApiError::unauthorized("User not found or inactive")
        })?;

    req.extensions_mut().insert(Principal::from(&user));
    Ok(next.run(req).await)
}

/// Fails with 403 unless the caller's role permits `action`.
pub fn authorize(principal: &Principal, action: Action) -> Result<(), ApiError> {
    if principal.role.can(action) {
        return Ok(());
    }

    warn!(user_id = %principal.user_id, role = %principal.role, ?action, "Permission denied");
    Err(ApiError::forbidden(format!(
        "Role {} may not perform {:?}",
        principal.role, action
    )))
}

// =============================================================================
// Login
// =============================================================================

/// Login failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password. The two are not told apart.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User account is inactive")]
    Inactive,

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                ApiError::new(ErrorCode::InvalidCredentials, err.to_string())
            }
            AuthError::Inactive => ApiError::new(ErrorCode::UserInactive, err.to_string()),
            AuthError::Db(db) => db.into(),
        }
    }
}

/// Checks credentials and records the login.
pub async fn authenticate(db: &Database, email: &str, password: &str) -> Result<User, AuthError> {
    let user = db
        .users()
        .get_by_email(email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_password(password, &user.password_hash) {
        warn!(user_id = %user.id, "Login failed: wrong password");
        return Err(AuthError::InvalidCredentials);
    }

    if !user.active {
        warn!(user_id = %user.id, "Login refused: inactive user");
        return Err(AuthError::Inactive);
    }

    db.users().record_login(&user.id).await?;
    info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok(user)
}
