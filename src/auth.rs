use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use crate::models::Claims;

/// HS256 secret used to verify bearer tokens. Token issuance lives outside
/// this service.
#[derive(Clone)]
pub struct JwtSecret(pub String);

pub struct AuthClaims(pub Claims);

impl<S> FromRequestParts<S> for AuthClaims
where
    S: Send + Sync,
    JwtSecret: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    (
                        StatusCode::UNAUTHORIZED,
                        "Missing or invalid Authorization header".into(),
                    )
                })?;

        AuthClaims::from_token(bearer.token(), &JwtSecret::from_ref(state))
    }
}

impl AuthClaims {
    pub fn from_token(token: &str, secret: &JwtSecret) -> Result<Self, (StatusCode, String)> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.0.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid or expired token".into()))?;

        Ok(Self(token_data.claims))
    }

    pub fn rater_id(&self) -> Result<i64, (StatusCode, String)> {
        self.0.rater_id().ok_or((
            StatusCode::UNAUTHORIZED,
            "Token subject is not a rater id".into(),
        ))
    }

    pub fn require_admin(&self) -> Result<(), (StatusCode, String)> {
        if self.0.is_admin {
            Ok(())
        } else {
            Err((StatusCode::FORBIDDEN, "Admin privileges required".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};

    use super::*;

    fn token(sub: &str, is_admin: bool, secret: &str) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            is_admin,
            exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token() {
        let secret = JwtSecret("secret".into());
        let claims = AuthClaims::from_token(&token("17", false, "secret"), &secret).unwrap();
        assert_eq!(claims.rater_id().unwrap(), 17);
        assert_eq!(claims.require_admin().unwrap_err().0, StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let secret = JwtSecret("secret".into());
        let err = AuthClaims::from_token(&token("17", false, "other"), &secret)
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_non_numeric_subject_rejected() {
        let secret = JwtSecret("secret".into());
        let claims = AuthClaims::from_token(&token("alice", true, "secret"), &secret).unwrap();
        assert!(claims.rater_id().is_err());
        assert!(claims.require_admin().is_ok());
    }
}
