//! Authentication and authorization.
//!
//! Credentials are verified against the users table; successful logins are
//! issued a signed JWT carrying the user id and expiry. Every authenticated
//! request re-reads the user row, so deactivating an account revokes access
//! immediately rather than at token expiry.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    entities::users::{self, UserRole},
    errors::ServiceError,
    AppState,
};

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Token issue/verify service.
#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiration_secs: u64,
}

impl AuthService {
    pub fn new(jwt_secret: &str, expiration_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation,
            expiration_secs,
        }
    }

    /// Issues a signed token carrying the user id and expiry.
    pub fn generate_token(&self, user_id: Uuid) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.expiration_secs as i64)).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::InternalError(format!("failed to sign token: {e}")))
    }

    /// Verifies a token's signature and expiry.
    pub fn verify_token(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => ServiceError::Unauthorized(
                    "Your token has expired. Please log in again.".to_string(),
                ),
                _ => ServiceError::Unauthorized("Invalid token. Please log in again.".to_string()),
            })
    }
}

/// Hashes a password with argon2 and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::InternalError(format!("failed to hash password: {e}")))
}

/// Verifies a password against a stored argon2 hash.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, ServiceError> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|e| ServiceError::InternalError(format!("malformed password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Actor identity resolved for the current request.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl From<&users::Model> for AuthUser {
    fn from(user: &users::Model) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.user_role(),
        }
    }
}

impl AuthUser {
    pub fn has_role(&self, role: UserRole) -> bool {
        self.role == role
    }

    /// Role gate: rejects with Forbidden unless the actor holds one of the
    /// allowed roles.
    pub fn require_any(&self, allowed: &[UserRole]) -> Result<(), ServiceError> {
        if allowed.contains(&self.role) {
            return Ok(());
        }
        let roles = allowed
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" or ");
        Err(ServiceError::Forbidden(format!(
            "You do not have permission to perform this action. Required role: {roles}"
        )))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let token = bearer_token(&parts.headers).ok_or_else(|| {
            ServiceError::Unauthorized(
                "You are not logged in. Please log in to access this resource.".to_string(),
            )
        })?;

        let claims = app_state.auth_service.verify_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| {
            ServiceError::Unauthorized("Invalid token. Please log in again.".to_string())
        })?;

        let user = users::Entity::find_by_id(user_id)
            .one(&*app_state.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::Unauthorized(
                    "The user belonging to this token no longer exists.".to_string(),
                )
            })?;

        if !user.is_active {
            return Err(ServiceError::Unauthorized(
                "Your account has been deactivated. Please contact an administrator.".to_string(),
            ));
        }

        Ok(AuthUser::from(&user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(expiration_secs: u64) -> AuthService {
        AuthService::new("test_secret_key_for_auth_unit_tests_only", expiration_secs)
    }

    #[test]
    fn token_round_trip() {
        let svc = service(3600);
        let user_id = Uuid::new_v4();
        let token = svc.generate_token(user_id).unwrap();
        let claims = svc.verify_token(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = service(0);
        let token = svc.generate_token(Uuid::new_v4()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(1100));
        let err = svc.verify_token(&token).unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let svc = service(3600);
        let other = AuthService::new("a_completely_different_secret_key_value", 3600);
        let token = other.generate_token(Uuid::new_v4()).unwrap();
        assert!(matches!(
            svc.verify_token(&token),
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn role_gate_enforces_membership() {
        let user = AuthUser {
            id: Uuid::new_v4(),
            name: "Pat".into(),
            email: "pat@example.com".into(),
            role: UserRole::Staff,
        };
        assert!(user
            .require_any(&[UserRole::Admin, UserRole::Manager])
            .is_err());
        assert!(user.require_any(&[UserRole::Staff]).is_ok());
    }
}
