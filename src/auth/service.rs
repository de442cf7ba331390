//! Session façade: login, register, refresh as atomic operations.

use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use super::credentials::CredentialVerifier;
use super::tokens::{AccessClaims, RotateMode, TokenConfig, TokenIssuer};
use crate::errors::ApiError;
use crate::events::EventSink;
use crate::store::{Account, AccountStore, Role};

/// Wire-safe projection of an account.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl From<&Account> for UserProfile {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            name: account.name.clone(),
            role: account.role,
        }
    }
}

/// Session payload returned by register, login, and refresh. The token field
/// names are part of the wire contract.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
}

pub struct SessionService {
    verifier: CredentialVerifier,
    issuer: TokenIssuer,
    events: Arc<dyn EventSink>,
}

impl SessionService {
    #[must_use]
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        config: TokenConfig,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            verifier: CredentialVerifier::new(accounts.clone()),
            issuer: TokenIssuer::new(config, accounts),
            events,
        }
    }

    #[instrument(skip_all, fields(email))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthResponse, ApiError> {
        let account = self.verifier.register(email, password, name).await?;
        let response = self.issue_pair(&account, RotateMode::Overwrite).await?;
        self.events
            .record("auth.register", json!({ "userId": account.id }));
        Ok(response)
    }

    #[instrument(skip_all, fields(email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let account = self.verifier.verify(email, password).await?;
        let response = self.issue_pair(&account, RotateMode::Overwrite).await?;
        self.events
            .record("auth.login", json!({ "userId": account.id }));
        Ok(response)
    }

    /// One-shot refresh: redeem the presented token, then rotate against the
    /// exact hash the redemption observed. A concurrent redemption of the
    /// same token loses the compare-and-swap and surfaces as revoked.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse, ApiError> {
        let (account, observed_hash) = self.issuer.redeem(refresh_token).await?;
        let response = self
            .issue_pair(&account, RotateMode::IfMatches(Some(observed_hash)))
            .await?;
        self.events
            .record("auth.refresh", json!({ "userId": account.id }));
        Ok(response)
    }

    /// Resolve a bearer access token; used by the route guard.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, ApiError> {
        self.issuer.verify_access(token)
    }

    async fn issue_pair(
        &self,
        account: &Account,
        mode: RotateMode,
    ) -> Result<AuthResponse, ApiError> {
        let access_token = self.issuer.issue_access(account)?;
        let refresh_token = self.issuer.rotate_refresh(account.id, mode).await?;

        Ok(AuthResponse {
            user: UserProfile::from(account),
            access_token,
            refresh_token,
        })
    }
}
