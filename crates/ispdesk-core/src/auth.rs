// ── Operator authentication ──
//
// A single admin credential pair from configuration. A successful login
// yields an HS256 bearer token; every later operation presents it.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::AuthSettings;
use crate::error::CoreError;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Bearer token handed out by [`Console::login`](crate::Console::login).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    pub token: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

/// Who a verified token belongs to and until when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

impl Principal {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

pub(crate) struct Authenticator {
    username: String,
    password: SecretString,
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Authenticator {
    pub(crate) fn new(settings: &AuthSettings) -> Self {
        let secret = settings.token_secret.expose_secret().as_bytes();
        Self {
            username: settings.username.clone(),
            password: settings.password.clone(),
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: settings.token_ttl,
        }
    }

    pub(crate) fn login(&self, username: &str, password: &str) -> Result<SessionToken, CoreError> {
        if username.trim() != self.username || password != self.password.expose_secret() {
            debug!(username, "login refused");
            return Err(CoreError::AuthenticationFailed {
                message: "Invalid username or password".into(),
            });
        }
        let token = self.issue_at(&self.username, Utc::now())?;
        info!(username = %token.username, expires_at = %token.expires_at, "operator logged in");
        Ok(token)
    }

    fn issue_at(&self, username: &str, now: DateTime<Utc>) -> Result<SessionToken, CoreError> {
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| CoreError::Config {
                message: format!("token lifetime out of range: {e}"),
            })?;
        let expires_at = now + ttl;
        let claims = Claims {
            sub: username.to_owned(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| CoreError::Internal(format!("token signing failed: {e}")))?;
        Ok(SessionToken {
            token,
            username: username.to_owned(),
            expires_at,
        })
    }

    /// Check signature and expiry.
    pub(crate) fn verify(&self, token: &str) -> Result<Principal, CoreError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                JwtErrorKind::ExpiredSignature => CoreError::SessionExpired,
                _ => CoreError::AuthenticationFailed {
                    message: format!("invalid session token: {e}"),
                },
            }
        })?;
        if data.claims.sub != self.username {
            return Err(CoreError::AuthenticationFailed {
                message: "session token belongs to another user".into(),
            });
        }
        let expires_at = Utc
            .timestamp_opt(data.claims.exp, 0)
            .single()
            .ok_or_else(|| CoreError::AuthenticationFailed {
                message: "session token has an invalid expiry".into(),
            })?;
        Ok(Principal {
            username: data.claims.sub,
            expires_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn auth() -> Authenticator {
        Authenticator::new(&AuthSettings {
            password: SecretString::from("s3cret".to_owned()),
            token_secret: SecretString::from("test-signing-key".to_owned()),
            ..AuthSettings::default()
        })
    }

    #[test]
    fn login_then_verify() {
        let auth = auth();
        let token = auth.login("admin", "s3cret").unwrap();
        let principal = auth.verify(&token.token).unwrap();
        assert_eq!(principal.username, "admin");
        assert_eq!(principal.expires_at.timestamp(), token.expires_at.timestamp());
    }

    #[test]
    fn wrong_password_is_refused() {
        let err = auth().login("admin", "nope").unwrap_err();
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
    }

    #[test]
    fn expired_token_is_session_expired() {
        let auth = auth();
        let issued = Utc::now() - chrono::Duration::hours(9);
        let token = auth.issue_at("admin", issued).unwrap();
        assert!(matches!(auth.verify(&token.token), Err(CoreError::SessionExpired)));
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let other = Authenticator::new(&AuthSettings {
            token_secret: SecretString::from("another-key".to_owned()),
            ..AuthSettings::default()
        });
        let token = other.login("admin", "password").unwrap();
        assert!(matches!(
            auth().verify(&token.token),
            Err(CoreError::AuthenticationFailed { .. })
        ));
        assert!(matches!(
            auth().verify("not-a-token"),
            Err(CoreError::AuthenticationFailed { .. })
        ));
    }
}
