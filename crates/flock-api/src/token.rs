//! Token codec: signed identity claims carrying only the user id.
//!
//! Tokens are issued without an expiry, matching the existing client
//! population's expectations — a leaked token stays valid until the signing
//! secret changes.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use flock_types::api::Claims;

pub fn issue(secret: &str, user_id: Uuid) -> anyhow::Result<String> {
    let claims = Claims { sub: user_id };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn verify(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    // No exp claim to validate.
    let mut validation = Validation::default();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn issue_verify_roundtrip() {
        let user_id = Uuid::new_v4();
        let token = issue(SECRET, user_id).unwrap();
        let claims = verify(SECRET, &token).unwrap();
        assert_eq!(claims.sub, user_id);
    }

    #[test]
    fn wrong_secret_fails() {
        let token = issue(SECRET, Uuid::new_v4()).unwrap();
        assert!(verify("other-secret", &token).is_err());
    }

    #[test]
    fn malformed_token_fails() {
        assert!(verify(SECRET, "not-a-token").is_err());
    }

    #[test]
    fn tampered_token_fails() {
        let token = issue(SECRET, Uuid::new_v4()).unwrap();
        let mut tampered = token.clone();
        tampered.truncate(token.len() - 2);
        assert!(verify(SECRET, &tampered).is_err());
    }
}
