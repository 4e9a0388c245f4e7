use base64::Engine as _;
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::Role;
use crate::error::{PanelError, TokenError};

const MAX_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Claims carried by every bearer token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    pub username: String,
    pub role: Role,
    /// Session token backing this bearer token; revoking the session revokes the token.
    pub sid: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 signer/verifier bound to one secret.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: TimeDelta,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        let ttl_secs = i64::try_from(ttl_secs)
            .unwrap_or(i64::MAX)
            .min(MAX_TTL_SECS);
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: TimeDelta::seconds(ttl_secs),
        }
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Signs a token for `session`, returning it with its expiry.
    pub fn issue(
        &self,
        user_id: i64,
        username: &str,
        role: Role,
        session: &str,
    ) -> Result<(String, DateTime<Utc>), PanelError> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            role,
            sid: session.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok((token, expires_at))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => TokenError::Malformed,
                _ => TokenError::Invalid,
            })
    }

    #[cfg(test)]
    fn sign_raw(&self, claims: &Claims) -> String {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).expect("sign")
    }
}

/// Random per-process secret for deployments that leave `auth.jwt_secret` empty.
pub fn generate_secret() -> String {
    let mut buf = [0u8; 48];
    rand::rng().fill_bytes(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_verify() {
        let signer = TokenSigner::new("unit-secret", 3600);
        let (token, exp) = signer
            .issue(7, "alice", Role::User, "sess-1")
            .expect("issue");
        let claims = signer.verify(&token).expect("verify");
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.sid, "sess-1");
        assert_eq!(claims.exp, exp.timestamp());
    }

    #[test]
    fn classifies_failures() {
        let signer = TokenSigner::new("unit-secret", 3600);
        let now = Utc::now().timestamp();
        let expired = signer.sign_raw(&Claims {
            sub: 1,
            username: "bob".into(),
            role: Role::Viewer,
            sid: "s".into(),
            iat: now - 7200,
            exp: now - 3600,
        });
        assert_eq!(signer.verify(&expired), Err(TokenError::Expired));
        assert_eq!(signer.verify("not-a-jwt"), Err(TokenError::Malformed));

        let (foreign, _) = TokenSigner::new("other-secret", 3600)
            .issue(1, "bob", Role::Viewer, "s")
            .expect("issue");
        assert_eq!(signer.verify(&foreign), Err(TokenError::Invalid));
    }

    #[test]
    fn generated_secrets_differ() {
        let a = generate_secret();
        assert!(a.len() >= 64);
        assert_ne!(a, generate_secret());
    }
}
