use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::{accounts::repo_types::Role, config::JwtConfig, state::AppState};

use super::claims::Claims;

/// Why a token failed verification. Logged server-side only; clients always
/// see the same generic rejection regardless of variant.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("empty token")]
    Empty,
    #[error("malformed token")]
    Malformed,
    #[error("token expired")]
    Expired,
    #[error("signature mismatch")]
    SignatureMismatch,
}

/// Signing and verification keys plus the claims config, built once from
/// `AppState` at the start of each request that needs them.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from_config(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn from_config(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ttl: Duration::minutes(config.ttl_minutes),
        }
    }

    pub fn sign(&self, subject: &str, role: Role) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + self.ttl;
        let claims = Claims {
            sub: subject.to_string(),
            role,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(subject = %subject, role = role.as_str(), "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        if token.is_empty() {
            return Err(TokenError::Empty);
        }
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::SignatureMismatch,
                _ => TokenError::Malformed,
            }
        })?;
        debug!(subject = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }

    /// Reads the subject without checking signature or expiry. For log
    /// correlation only; never trust this without a `verify` call.
    pub fn extract_subject(&self, token: &str) -> Option<String> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        decode::<Claims>(token, &self.decoding, &validation)
            .ok()
            .map(|data| data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: "test-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
        })
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let keys = make_keys();
        let token = keys.sign("ada@example.com", Role::User).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, "ada@example.com");
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = make_keys();
        let past = OffsetDateTime::now_utc() - Duration::hours(2);
        let claims = Claims {
            sub: "ada@example.com".into(),
            role: Role::User,
            iat: (past - Duration::minutes(5)).unix_timestamp() as usize,
            exp: past.unix_timestamp() as usize,
            iss: keys.issuer.clone(),
            aud: keys.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        assert_eq!(keys.verify(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn verify_rejects_wrong_signature() {
        let keys = make_keys();
        let other = JwtKeys {
            encoding: EncodingKey::from_secret(b"other-secret"),
            decoding: DecodingKey::from_secret(b"other-secret"),
            issuer: keys.issuer.clone(),
            audience: keys.audience.clone(),
            ttl: keys.ttl,
        };
        let token = other.sign("ada@example.com", Role::User).expect("sign");
        assert_eq!(keys.verify(&token).unwrap_err(), TokenError::SignatureMismatch);
    }

    #[test]
    fn verify_rejects_garbage_and_empty_input() {
        let keys = make_keys();
        assert_eq!(keys.verify("").unwrap_err(), TokenError::Empty);
        assert_eq!(keys.verify("not.a.jwt").unwrap_err(), TokenError::Malformed);
        assert_eq!(keys.verify("nonsense").unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn two_tokens_for_same_subject_both_verify() {
        let keys = make_keys();
        let first = keys.sign("ada@example.com", Role::User).expect("sign");
        let second = keys.sign("ada@example.com", Role::User).expect("sign");
        assert!(keys.verify(&first).is_ok());
        assert!(keys.verify(&second).is_ok());
    }

    #[test]
    fn extract_subject_works_on_expired_tokens() {
        let keys = make_keys();
        let past = OffsetDateTime::now_utc() - Duration::hours(2);
        let claims = Claims {
            sub: "ada@example.com".into(),
            role: Role::User,
            iat: past.unix_timestamp() as usize,
            exp: past.unix_timestamp() as usize,
            iss: keys.issuer.clone(),
            aud: keys.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        assert_eq!(keys.extract_subject(&token).as_deref(), Some("ada@example.com"));
        assert_eq!(keys.extract_subject("garbage"), None);
    }
}
