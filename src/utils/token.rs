use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorMessage, HttpError};

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub iat: usize,
    pub exp: usize,
}

pub fn create_token(
    user_id: &str,
    roles: &[String],
    secret: &[u8],
    expires_in_seconds: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    if user_id.is_empty() {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into());
    }

    let now = Utc::now();
    let iat = now.timestamp() as usize;
    let exp = (now + Duration::seconds(expires_in_seconds)).timestamp() as usize;
    let claims = TokenClaims {
        sub: user_id.to_string(),
        roles: roles.to_vec(),
        iat,
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
}

pub fn decode_token<T: Into<String>>(token: T, secret: &[u8]) -> Result<TokenClaims, HttpError> {
    let decoded = decode::<TokenClaims>(
        &token.into(),
        &DecodingKey::from_secret(secret),
        &Validation::new(jsonwebtoken::Algorithm::HS256),
    );

    match decoded {
        Ok(token) => Ok(token.claims),
        Err(_) => Err(HttpError::unauthorized(
            ErrorMessage::InvalidToken.to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-jwt-secret";

    #[test]
    fn round_trips_sub_and_roles() {
        let user_id = uuid::Uuid::new_v4().to_string();
        let roles = vec!["customer".to_string()];
        let token = create_token(&user_id, &roles, SECRET, 60).unwrap();

        let claims = decode_token(token, SECRET).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.roles, roles);
    }

    #[test]
    fn rejects_empty_subject() {
        let result = create_token("", &[], SECRET, 60);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let user_id = uuid::Uuid::new_v4().to_string();
        // Stay clear of the validator's default 60s leeway.
        let token = create_token(&user_id, &[], SECRET, -300).unwrap();

        let result = decode_token(token, SECRET);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_wrong_secret() {
        let user_id = uuid::Uuid::new_v4().to_string();
        let token = create_token(&user_id, &[], SECRET, 60).unwrap();

        let result = decode_token(token, b"some-other-secret");
        assert!(result.is_err());
    }
}
