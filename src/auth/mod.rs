/*!
 * # Authentication and Authorization Module
 *
 * Identity resolution and the per-operation authorization gate.
 *
 * Every incoming request passes through [`identity_middleware`], which decodes
 * the bearer credential (if any) exactly once into an [`Identity`] attached to
 * the request. Decoding is best-effort: a missing, malformed, or expired token
 * yields [`Identity::Anonymous`] rather than an error; rejection is deferred
 * to the authorization gate of whichever operation actually requires a role.
 *
 * Handlers receive the resolved identity as an extractor argument and gate
 * themselves explicitly via [`Identity::require_role`] before touching any
 * business state.
 */

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::entities::user;
use crate::errors::ServiceError;

pub use crate::entities::user::Role;

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,          // Subject (user ID)
    pub name: Option<String>, // User's name
    pub email: Option<String>,
    pub role: String, // Single coarse-grained role: "Admin" or "User"
    pub jti: String,  // Unique identifier for this token
    pub iat: i64,     // Issued at time
    pub exp: i64,     // Expiration time
    pub iss: String,  // Issuer
    pub aud: String,  // Audience
}

/// Identity resolved from the bearer credential, valid for one request.
///
/// `Anonymous` covers every decode failure as well as the absence of a
/// credential; the distinction is invisible to handlers on purpose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    Known { user_id: i32, role: Role },
}

impl Identity {
    /// Authorization gate: allow the operation only for the required role,
    /// returning the caller's subject id.
    ///
    /// Runs before any repository access. A missing identity and a wrong role
    /// are distinct rejections internally but share the same HTTP status.
    pub fn require_role(&self, required: Role) -> Result<i32, ServiceError> {
        match self {
            Identity::Anonymous => Err(ServiceError::Unauthorized(
                "Invalid or missing token.".to_string(),
            )),
            Identity::Known { user_id, role } if *role == required => Ok(*user_id),
            Identity::Known { .. } => Err(ServiceError::Forbidden(
                "You do not have permission to use this resource.".to_string(),
            )),
        }
    }

    pub fn require_user(&self) -> Result<i32, ServiceError> {
        self.require_role(Role::User)
    }

    pub fn require_admin(&self) -> Result<i32, ServiceError> {
        self.require_role(Role::Admin)
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Identity>()
            .cloned()
            .unwrap_or(Identity::Anonymous))
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_issuer: String,
        jwt_audience: String,
        token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            token_expiration,
        }
    }
}

/// Authentication service that handles token issuance and identity resolution
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Generate a JWT token for a user
    pub fn issue_token(&self, user: &user::Model) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.token_expiration)
                .map_err(|_| AuthError::TokenCreation("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            name: Some(user.name.clone()),
            email: Some(user.email.clone()),
            role: user.role.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn decode_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }

    /// Resolve the `Authorization` header into an identity, best-effort.
    ///
    /// Any failure along the way (missing header, wrong scheme, undecodable
    /// token, non-numeric subject, unknown role) produces `Anonymous`; no
    /// error escapes resolution.
    pub fn resolve(&self, authorization: Option<&str>) -> Identity {
        let Some(value) = authorization else {
            return Identity::Anonymous;
        };
        let Some(token) = value.strip_prefix("Bearer ") else {
            return Identity::Anonymous;
        };

        match self.decode_token(token.trim()) {
            Ok(claims) => {
                let user_id = match claims.sub.parse::<i32>() {
                    Ok(id) => id,
                    Err(_) => return Identity::Anonymous,
                };
                match Role::from_str(&claims.role) {
                    Ok(role) => Identity::Known { user_id, role },
                    Err(_) => Identity::Anonymous,
                }
            }
            Err(_) => Identity::Anonymous,
        }
    }
}

/// Middleware that resolves the caller's identity once per request and
/// attaches it to the request extensions. Never rejects; anonymous callers
/// proceed and are stopped (or not) by each operation's gate.
pub async fn identity_middleware(
    State(auth): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned);

    let identity = auth.resolve(authorization.as_deref());
    request.extensions_mut().insert(identity);

    next.run(request).await
}

/// Hash a password with argon2 and a fresh salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::HashError(e.to_string()))
}

/// Verify a password against a stored argon2 hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::HashError(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Hash error: {0}")]
    HashError(String),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                ServiceError::Unauthorized("Invalid credentials".to_string())
            }
            AuthError::InvalidToken | AuthError::TokenExpired => {
                ServiceError::Unauthorized("Invalid or missing token.".to_string())
            }
            AuthError::TokenCreation(msg) | AuthError::HashError(msg) => {
                ServiceError::InternalError(msg)
            }
        }
    }
}
