//! Token issuance and one-shot refresh rotation.
//!
//! Access tokens are short-lived and pure functions of account + clock +
//! secret. Refresh tokens embed a random identifier (jti) whose hash is the
//! only thing persisted; rotating writes a new hash, which instantly revokes
//! the previous identifier. Redemption is always one-shot: every successful
//! redeem produces exactly one new refresh token and invalidates the redeemed
//! one.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::credentials;
use crate::errors::ApiError;
use crate::store::{Account, AccountStore, Role, StoreError};

pub const REFRESH_KIND: &str = "refresh";

const DEFAULT_ACCESS_TTL_MINUTES: i64 = 15;
const DEFAULT_REFRESH_TTL_DAYS: i64 = 7;

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    /// Plaintext refresh identifier; only its hash is ever stored.
    pub jti: String,
    pub kind: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signing configuration. The two token types use independent secrets and
/// lifetimes.
#[derive(Clone)]
pub struct TokenConfig {
    access_secret: SecretString,
    refresh_secret: SecretString,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenConfig {
    #[must_use]
    pub fn new(access_secret: SecretString, refresh_secret: SecretString) -> Self {
        Self {
            access_secret,
            refresh_secret,
            access_ttl: Duration::minutes(DEFAULT_ACCESS_TTL_MINUTES),
            refresh_ttl: Duration::days(DEFAULT_REFRESH_TTL_DAYS),
        }
    }

    #[must_use]
    pub fn with_access_ttl_minutes(mut self, minutes: i64) -> Self {
        self.access_ttl = Duration::minutes(minutes);
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_days(mut self, days: i64) -> Self {
        self.refresh_ttl = Duration::days(days);
        self
    }
}

/// How a rotation treats the previously stored hash.
#[derive(Debug, Clone)]
pub enum RotateMode {
    /// Login/register: whatever session existed before is superseded.
    Overwrite,
    /// Refresh: only the caller that observed this exact hash may rotate.
    /// Losing the compare-and-swap means a concurrent redemption won.
    IfMatches(Option<String>),
}

pub struct TokenIssuer {
    config: TokenConfig,
    accounts: Arc<dyn AccountStore>,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(config: TokenConfig, accounts: Arc<dyn AccountStore>) -> Self {
        Self { config, accounts }
    }

    pub fn issue_access(&self, account: &Account) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: account.id,
            email: account.email.clone(),
            role: account.role,
            iat: now.timestamp(),
            exp: (now + self.config.access_ttl).timestamp(),
        };
        sign(&claims, &self.config.access_secret)
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, ApiError> {
        decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.config.access_secret.expose_secret().as_bytes()),
            &strict_validation(),
        )
        .map(|data| data.claims)
        .map_err(|_| ApiError::Unauthorized)
    }

    /// Generate a fresh refresh identifier, persist its hash according to
    /// `mode`, and return the signed refresh token embedding the plaintext
    /// identifier. The hash write and the decision to hand the token back are
    /// one unit: if the write does not land, no token is returned.
    pub async fn rotate_refresh(
        &self,
        account_id: Uuid,
        mode: RotateMode,
    ) -> Result<String, ApiError> {
        let jti = Uuid::new_v4().to_string();
        let hash = credentials::hash_secret(&jti)?;

        match mode {
            RotateMode::Overwrite => {
                self.accounts
                    .set_refresh_hash(account_id, &hash)
                    .await
                    .map_err(rotate_store_error)?;
            }
            RotateMode::IfMatches(expected) => {
                let swapped = self
                    .accounts
                    .swap_refresh_hash(account_id, expected.as_deref(), &hash)
                    .await
                    .map_err(rotate_store_error)?;
                if !swapped {
                    return Err(ApiError::RevokedToken);
                }
            }
        }

        let now = Utc::now();
        let claims = RefreshClaims {
            sub: account_id,
            jti,
            kind: REFRESH_KIND.to_string(),
            iat: now.timestamp(),
            exp: (now + self.config.refresh_ttl).timestamp(),
        };
        sign(&claims, &self.config.refresh_secret)
    }

    /// Signature and expiry check only; revocation is [`Self::redeem`]'s job.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, ApiError> {
        decode::<RefreshClaims>(
            token,
            &DecodingKey::from_secret(self.config.refresh_secret.expose_secret().as_bytes()),
            &strict_validation(),
        )
        .map(|data| data.claims)
        .map_err(|_| ApiError::InvalidToken)
    }

    /// Verify + revocation check. On success returns the account together
    /// with the stored hash the check ran against, so the follow-up rotation
    /// can compare-and-swap on exactly that observation.
    pub async fn redeem(&self, token: &str) -> Result<(Account, String), ApiError> {
        let claims = self.verify_refresh(token)?;

        if claims.kind != REFRESH_KIND {
            return Err(ApiError::InvalidToken);
        }

        let account = self
            .accounts
            .find_by_id(claims.sub)
            .await
            .map_err(|err| ApiError::Internal(anyhow::anyhow!("account lookup failed: {err}")))?
            .ok_or_else(|| ApiError::NotFound(format!("User with ID {} not found", claims.sub)))?;

        let Some(stored) = account.current_refresh_hash.clone() else {
            return Err(ApiError::RevokedToken);
        };

        if !credentials::verify_secret(&claims.jti, &stored) {
            return Err(ApiError::RevokedToken);
        }

        Ok((account, stored))
    }
}

fn sign<T: Serialize>(claims: &T, secret: &SecretString) -> Result<String, ApiError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .map_err(|err| ApiError::Internal(anyhow::anyhow!("token signing failed: {err}")))
}

fn strict_validation() -> Validation {
    let mut validation = Validation::default();
    // No leeway: an expired token is expired.
    validation.leeway = 0;
    validation
}

fn rotate_store_error(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound => ApiError::NotFound("User not found".to_string()),
        StoreError::Conflict => {
            ApiError::Internal(anyhow::anyhow!("unexpected conflict rotating refresh hash"))
        }
    }
}
