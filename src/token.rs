//! Bearer-token verification.
//!
//! Thin wrapper over [`jsonwebtoken`]: check the signature with the configured
//! key, then decode the payload into typed [`Claims`]. The two steps fail
//! differently: a token that is not authentic is [`TokenError::Invalid`], an
//! authentic token whose payload lacks `user.acl.permissions` is
//! [`TokenError::Claims`].

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};

use crate::claims::Claims;
use crate::error::Error;

const RSA_ALGORITHMS: [Algorithm; 3] = [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];
const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Why a token was refused.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Bad signature, foreign algorithm, expired, or not a JWT at all.
    #[error("token is not valid: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    /// Authentic token, but the payload is not the expected claims shape.
    #[error("{0}")]
    Claims(String),

    /// The verification primitive panicked.
    #[error("token verification failed unexpectedly: {0}")]
    Internal(String),
}

/// The key tokens are verified against, together with the algorithm family it
/// accepts. Tokens signed with any other algorithm are refused, whatever their
/// signature.
#[derive(Clone)]
pub struct VerifyKey {
    key: DecodingKey,
    validation: Validation,
}

impl VerifyKey {
    /// RSA public key in PEM form (`PUBLIC KEY` or `RSA PUBLIC KEY`).
    /// Accepts RS256, RS384 and RS512.
    pub fn rsa_pem(pem: &[u8]) -> Result<Self, Error> {
        Ok(Self::new(DecodingKey::from_rsa_pem(pem)?, &RSA_ALGORITHMS))
    }

    /// RSA public key from base64url modulus and exponent (a JWKS entry).
    pub fn rsa_components(modulus: &str, exponent: &str) -> Result<Self, Error> {
        Ok(Self::new(DecodingKey::from_rsa_components(modulus, exponent)?, &RSA_ALGORITHMS))
    }

    /// Shared secret. Accepts HS256, HS384 and HS512.
    pub fn hmac(secret: &[u8]) -> Self {
        Self::new(DecodingKey::from_secret(secret), &HMAC_ALGORITHMS)
    }

    fn new(key: DecodingKey, algorithms: &[Algorithm]) -> Self {
        let mut validation = Validation::new(algorithms[0]);
        validation.algorithms = algorithms.to_vec();
        // `exp` and `nbf` are checked when present, never required.
        validation.required_spec_claims.clear();
        validation.validate_nbf = true;
        validation.validate_aud = false;
        Self { key, validation }
    }

    pub fn algorithms(&self) -> &[Algorithm] {
        &self.validation.algorithms
    }

    /// Verifies `token` and decodes its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let decoded = panic::catch_unwind(AssertUnwindSafe(|| {
            jsonwebtoken::decode::<Map<String, Value>>(token, &self.key, &self.validation)
        }))
        .map_err(|payload| TokenError::Internal(panic_message(payload.as_ref())))?
        .map_err(TokenError::Invalid)?;

        serde_json::from_value(Value::Object(decoded.claims))
            .map_err(|e| TokenError::Claims(e.to_string()))
    }
}

impl fmt::Debug for VerifyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyKey")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    const RSA_PRIVATE: &[u8] = include_bytes!("../tests/fixtures/rsa_private.pem");
    const RSA_PUBLIC: &[u8] = include_bytes!("../tests/fixtures/rsa_public.pem");

    fn valid_claims() -> Value {
        json!({"user": {"acl": {"permissions": {"g": {"/items": ["read"]}}}}})
    }

    fn hs256(secret: &[u8], claims: &Value) -> String {
        encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    #[test]
    fn hmac_round_trip() {
        let key = VerifyKey::hmac(b"s3cret");
        let claims = key.verify(&hs256(b"s3cret", &valid_claims())).unwrap();
        assert!(claims.permits("/items", crate::Action::Read));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let key = VerifyKey::hmac(b"s3cret");
        let err = key.verify(&hs256(b"other", &valid_claims())).unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)));
    }

    #[test]
    fn garbage_is_invalid_not_a_claims_error() {
        let key = VerifyKey::hmac(b"s3cret");
        assert!(matches!(key.verify("not-a-jwt"), Err(TokenError::Invalid(_))));
        assert!(matches!(key.verify("e30.e30.e30"), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn expired_token_is_invalid() {
        let key = VerifyKey::hmac(b"s3cret");
        let mut claims = valid_claims();
        claims["exp"] = json!(1_000_000);
        assert!(matches!(key.verify(&hs256(b"s3cret", &claims)), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn token_not_yet_valid_is_invalid() {
        let key = VerifyKey::hmac(b"s3cret");
        let mut claims = valid_claims();
        claims["nbf"] = json!(4_000_000_000u64);
        assert!(matches!(key.verify(&hs256(b"s3cret", &claims)), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn authentic_token_with_wrong_shape_is_a_claims_error() {
        let key = VerifyKey::hmac(b"s3cret");
        let token = hs256(b"s3cret", &json!({"user": {"name": "alice"}}));
        match key.verify(&token) {
            Err(TokenError::Claims(msg)) => assert!(msg.contains("acl"), "{msg}"),
            other => panic!("expected claims error, got {other:?}"),
        }
    }

    #[test]
    fn rsa_round_trip() {
        let key = VerifyKey::rsa_pem(RSA_PUBLIC).unwrap();
        let token = encode(
            &Header::new(Algorithm::RS256),
            &valid_claims(),
            &EncodingKey::from_rsa_pem(RSA_PRIVATE).unwrap(),
        )
        .unwrap();
        assert!(key.verify(&token).is_ok());
    }

    #[test]
    fn hmac_token_signed_with_the_public_key_is_refused_by_an_rsa_key() {
        let key = VerifyKey::rsa_pem(RSA_PUBLIC).unwrap();
        let forged = hs256(RSA_PUBLIC, &valid_claims());
        assert!(matches!(key.verify(&forged), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn rsa_key_accepts_only_rsa_family() {
        let key = VerifyKey::rsa_pem(RSA_PUBLIC).unwrap();
        assert_eq!(key.algorithms(), &RSA_ALGORITHMS);
        assert!(format!("{key:?}").contains("RS256"));
    }

    #[test]
    fn malformed_pem_is_a_key_error() {
        assert!(matches!(VerifyKey::rsa_pem(b"not a pem"), Err(Error::Key(_))));
    }

    #[test]
    fn panic_payloads_become_messages() {
        let payload = panic::catch_unwind(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom 1");
    }
}
