//! Snowflake SQL API credentials

use crate::config::{
    SnowflakeAuthMethod, SnowflakeSettings, ENV_SNOWFLAKE_OAUTH_TOKEN,
    ENV_SNOWFLAKE_PRIVATE_KEY_PATH, ENV_SNOWFLAKE_PUBLIC_KEY_FP,
};
use crate::error::{Error, Result, ResultExt};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;

/// Snowflake rejects key-pair tokens living longer than an hour
const JWT_LIFETIME_SECS: i64 = 59 * 60;

#[derive(Debug, Serialize)]
struct KeyPairClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    iat: i64,
    exp: i64,
}

/// Credential presented to the SQL API on every request
#[derive(Clone)]
pub enum SnowflakeCredential {
    /// RSA key registered on the user; a fresh JWT is signed per request
    KeyPair {
        key: EncodingKey,
        issuer: String,
        subject: String,
    },
    /// Pre-issued OAuth access token
    OAuth { token: String },
}

impl std::fmt::Debug for SnowflakeCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeyPair { issuer, .. } => f
                .debug_struct("KeyPair")
                .field("issuer", issuer)
                .finish_non_exhaustive(),
            Self::OAuth { .. } => f.debug_struct("OAuth").finish_non_exhaustive(),
        }
    }
}

impl SnowflakeCredential {
    /// Build a key-pair credential
    ///
    /// `account` is the account locator and `fingerprint` the public key's
    /// `SHA256:...` fingerprint as shown by `DESC USER`.
    pub fn key_pair(private_key_pem: &[u8], account: &str, user: &str, fingerprint: &str) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(private_key_pem).map_err(|e| Error::Jwt {
            message: format!("Invalid private key: {e}"),
        })?;
        let subject = format!("{}.{}", account.to_uppercase(), user.to_uppercase());
        let fingerprint = fingerprint.trim();
        let fingerprint = if fingerprint.starts_with("SHA256:") {
            fingerprint.to_string()
        } else {
            format!("SHA256:{fingerprint}")
        };
        Ok(Self::KeyPair {
            key,
            issuer: format!("{subject}.{fingerprint}"),
            subject,
        })
    }

    /// Build an OAuth credential
    pub fn oauth(token: impl Into<String>) -> Self {
        Self::OAuth {
            token: token.into(),
        }
    }

    /// Resolve the credential from settings and environment variables
    pub fn from_env(settings: &SnowflakeSettings) -> Result<Self> {
        match settings.auth {
            SnowflakeAuthMethod::Oauth => {
                let token = std::env::var(ENV_SNOWFLAKE_OAUTH_TOKEN).map_err(|_| {
                    Error::config(format!("{ENV_SNOWFLAKE_OAUTH_TOKEN} is not set"))
                })?;
                Ok(Self::oauth(token))
            }
            SnowflakeAuthMethod::KeyPair => {
                let key_path = std::env::var(ENV_SNOWFLAKE_PRIVATE_KEY_PATH).map_err(|_| {
                    Error::config(format!("{ENV_SNOWFLAKE_PRIVATE_KEY_PATH} is not set"))
                })?;
                let fingerprint = std::env::var(ENV_SNOWFLAKE_PUBLIC_KEY_FP).map_err(|_| {
                    Error::config(format!("{ENV_SNOWFLAKE_PUBLIC_KEY_FP} is not set"))
                })?;
                let pem = std::fs::read(&key_path)
                    .with_context(|| format!("Failed to read private key {key_path}"))?;
                Self::key_pair(
                    &pem,
                    &settings.account_locator(),
                    &settings.login()?,
                    &fingerprint,
                )
            }
        }
    }

    /// Value of the `X-Snowflake-Authorization-Token-Type` header
    pub fn token_type(&self) -> &'static str {
        match self {
            Self::KeyPair { .. } => "KEYPAIR_JWT",
            Self::OAuth { .. } => "OAUTH",
        }
    }

    /// Bearer token for the next request
    pub fn bearer(&self) -> Result<String> {
        match self {
            Self::OAuth { token } => Ok(token.clone()),
            Self::KeyPair {
                key,
                issuer,
                subject,
            } => {
                let now = Utc::now().timestamp();
                let claims = KeyPairClaims {
                    iss: issuer,
                    sub: subject,
                    iat: now,
                    exp: now + JWT_LIFETIME_SECS,
                };
                encode(&Header::new(Algorithm::RS256), &claims, key).map_err(|e| Error::Jwt {
                    message: format!("Failed to encode JWT: {e}"),
                })
            }
        }
    }
}
