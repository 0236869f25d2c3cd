//! Session Token Authentication
//!
//! HS256 session tokens binding `(session_id, player, seed)` with an
//! expiry. The engine treats a valid token purely as proof of the
//! `(session_id, player)` binding; everything else stays server-side.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Authentication configuration.
#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
    /// Expected issuer claim ("iss"). If None, any issuer accepted.
    pub issuer: Option<String>,
    /// HS256 signing secret.
    pub secret: Option<String>,
    /// Whether to skip expiry validation (for testing only).
    pub skip_expiry: bool,
}

impl AuthConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            issuer: std::env::var("GLOOM_AUTH_ISSUER").ok(),
            secret: std::env::var("GLOOM_AUTH_SECRET").ok(),
            skip_expiry: std::env::var("GLOOM_AUTH_SKIP_EXPIRY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }

    /// Check if authentication is configured.
    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }
}

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the player's wallet address.
    pub sub: String,
    /// Session (or party) identifier.
    pub sid: String,
    /// Seed issued for this session.
    pub seed: String,
    /// Expiry timestamp (Unix seconds).
    #[serde(default)]
    pub exp: u64,
    /// Issued at timestamp.
    #[serde(default)]
    pub iat: u64,
    /// Issuer.
    #[serde(default)]
    pub iss: Option<String>,
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No authentication configured on server.
    #[error("authentication not configured")]
    NotConfigured,
    /// Token format is invalid.
    #[error("invalid token format")]
    InvalidFormat,
    /// Token signature verification failed.
    #[error("invalid signature")]
    InvalidSignature,
    /// Token has expired.
    #[error("token expired")]
    Expired,
    /// Issuer claim doesn't match expected value.
    #[error("invalid issuer")]
    InvalidIssuer,
    /// Required claim is missing.
    #[error("missing required claim: {0}")]
    MissingClaim(String),
    /// JWT encoding/decoding error.
    #[error("token error: {0}")]
    TokenError(String),
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Issue a session token for `(session_id, player, seed)` with a TTL.
pub fn issue_session_token(
    config: &AuthConfig,
    session_id: &str,
    player: &str,
    seed: &str,
    ttl_secs: u64,
) -> Result<String, AuthError> {
    let Some(ref secret) = config.secret else {
        return Err(AuthError::NotConfigured);
    };

    let now = unix_now();
    let claims = SessionClaims {
        sub: player.to_string(),
        sid: session_id.to_string(),
        seed: seed.to_string(),
        exp: now + ttl_secs,
        iat: now,
        iss: config.issuer.clone(),
    };

    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&header, &claims, &key).map_err(|e| AuthError::TokenError(e.to_string()))
}

/// Validate a session token and extract its claims.
pub fn validate_token(token: &str, config: &AuthConfig) -> Result<SessionClaims, AuthError> {
    let Some(ref secret) = config.secret else {
        return Err(AuthError::NotConfigured);
    };

    let mut validation = Validation::new(Algorithm::HS256);
    validation.required_spec_claims = std::collections::HashSet::new();
    validation.validate_aud = false;

    if let Some(ref issuer) = config.issuer {
        validation.set_issuer(&[issuer]);
    }
    if config.skip_expiry {
        validation.validate_exp = false;
    }

    let key = DecodingKey::from_secret(secret.as_bytes());
    let token_data: TokenData<SessionClaims> =
        decode(token, &key, &validation).map_err(map_jwt_error)?;

    let claims = token_data.claims;

    if claims.sub.is_empty() {
        return Err(AuthError::MissingClaim("sub".into()));
    }
    if claims.sid.is_empty() {
        return Err(AuthError::MissingClaim("sid".into()));
    }

    // Manual expiry check (in case validation was skipped)
    if !config.skip_expiry && claims.exp > 0 && unix_now() > claims.exp {
        return Err(AuthError::Expired);
    }

    Ok(claims)
}

/// Map JWT library errors to our error type.
fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
        ErrorKind::InvalidToken | ErrorKind::Base64(_) => AuthError::InvalidFormat,
        _ => AuthError::TokenError(err.to_string()),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AuthConfig {
        AuthConfig {
            issuer: None,
            secret: Some("test-secret-key-256-bits-long!!".into()),
            skip_expiry: false,
        }
    }

    #[test]
    fn test_issue_and_validate_roundtrip() {
        let config = test_config();
        let token =
            issue_session_token(&config, "session-1", "addr_ana", "seed_abc123", 3600).unwrap();

        let claims = validate_token(&token, &config).unwrap();
        assert_eq!(claims.sub, "addr_ana");
        assert_eq!(claims.sid, "session-1");
        assert_eq!(claims.seed, "seed_abc123");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let config = test_config();
        let token =
            issue_session_token(&config, "session-1", "addr_ana", "seed_abc123", 3600).unwrap();

        let other = AuthConfig {
            secret: Some("a-completely-different-secret!!!".into()),
            ..AuthConfig::default()
        };
        let result = validate_token(&token, &other);
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let config = test_config();
        let token = issue_session_token(&config, "session-1", "addr_ana", "seed_abc123", 0).unwrap();

        // ttl 0 means exp == iat; wait for the boundary by shifting exp back
        // isn't possible here, so rely on the strict check below.
        let mut claims = validate_token(
            &token,
            &AuthConfig { skip_expiry: true, ..test_config() },
        )
        .unwrap();
        claims.exp = 1;

        let header = Header::new(Algorithm::HS256);
        let key = EncodingKey::from_secret("test-secret-key-256-bits-long!!".as_bytes());
        let stale = encode(&header, &claims, &key).unwrap();

        let result = validate_token(&stale, &config);
        assert!(matches!(result, Err(AuthError::Expired)));
    }

    #[test]
    fn test_skip_expiry_for_testing() {
        let mut config = test_config();
        config.skip_expiry = true;

        let token = issue_session_token(&config, "session-1", "addr_ana", "seed_abc123", 0).unwrap();
        assert!(validate_token(&token, &config).is_ok());
    }

    #[test]
    fn test_issuer_validation() {
        let issuing = AuthConfig {
            issuer: Some("gloomspire".into()),
            ..test_config()
        };
        let token =
            issue_session_token(&issuing, "session-1", "addr_ana", "seed_abc123", 3600).unwrap();

        assert!(validate_token(&token, &issuing).is_ok());

        let expecting_other = AuthConfig {
            issuer: Some("someone-else".into()),
            ..test_config()
        };
        let result = validate_token(&token, &expecting_other);
        assert!(matches!(result, Err(AuthError::InvalidIssuer)));
    }

    #[test]
    fn test_not_configured_error() {
        let config = AuthConfig::default();
        assert!(matches!(
            validate_token("some.jwt.token", &config),
            Err(AuthError::NotConfigured)
        ));
        assert!(matches!(
            issue_session_token(&config, "s", "p", "seed", 10),
            Err(AuthError::NotConfigured)
        ));
    }
}
