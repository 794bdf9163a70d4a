use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::users;
use crate::errors::AppError;
use crate::models::user::UserRow;
use crate::state::AppState;

/// Session lifetime.
pub const SESSION_DAYS: i64 = 7;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 signing and verification keys derived from `JWT_SECRET`.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(SESSION_DAYS)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to sign session token: {e}")))
    }

    /// Returns the user id of a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Result<Uuid, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| AppError::Unauthorized)?;
        Uuid::parse_str(&data.claims.sub).map_err(|_| AppError::Unauthorized)
    }
}

/// Extractor for a signed-in, non-banned user. The row is reloaded on every request.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserRow);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?;

        let user_id = state.jwt.verify(token)?;
        let user = users::find_by_id(&state.db, user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if user.is_banned {
            return Err(AppError::Forbidden("This account has been suspended".into()));
        }
        Ok(AuthUser(user))
    }
}

impl AuthUser {
    /// Fails closed unless the user has accepted the legal policies.
    pub fn require_policies(&self) -> Result<(), AppError> {
        if self.0.has_accepted_policies() {
            Ok(())
        } else {
            Err(AppError::PoliciesNotAccepted)
        }
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.0.can_administer() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin access required".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::sample_user;

    #[test]
    fn test_issue_then_verify() {
        let keys = JwtKeys::from_secret("test-secret");
        let id = Uuid::new_v4();
        let token = keys.issue(id).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), id);
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let token = JwtKeys::from_secret("a").issue(Uuid::new_v4()).unwrap();
        let err = JwtKeys::from_secret("b").verify(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        let secret = "s";
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            iat: 0,
            exp: Utc::now().timestamp() - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();
        let err = JwtKeys::from_secret(secret).verify(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[test]
    fn test_require_policies_fails_closed() {
        let mut user = sample_user();
        assert!(matches!(
            AuthUser(user.clone()).require_policies(),
            Err(AppError::PoliciesNotAccepted)
        ));
        user.accepted_policies = true;
        assert!(AuthUser(user).require_policies().is_ok());
    }

    #[test]
    fn test_require_admin() {
        let mut user = sample_user();
        assert!(AuthUser(user.clone()).require_admin().is_err());
        user.role = "admin".into();
        assert!(AuthUser(user).require_admin().is_ok());
    }
}
