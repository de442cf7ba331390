//! Credential verification with a salted adaptive hash.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::Arc;
use tracing::debug;

use crate::errors::ApiError;
use crate::store::{Account, AccountStore, StoreError};

/// Hash a secret (password or refresh identifier) with Argon2id and a fresh
/// random salt.
pub fn hash_secret(secret: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ApiError::Internal(anyhow::anyhow!("hashing failed: {err}")))
}

/// Constant-result comparison against a stored hash. Malformed stored hashes
/// count as a mismatch rather than an error.
#[must_use]
pub fn verify_secret(secret: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    })
}

/// Internal verification outcome. The two failure arms exist so logs can tell
/// them apart; they must collapse to one error before leaving this module.
enum VerifyOutcome {
    Ok(Account),
    UnknownEmail,
    BadPassword,
}

pub struct CredentialVerifier {
    accounts: Arc<dyn AccountStore>,
}

impl CredentialVerifier {
    #[must_use]
    pub fn new(accounts: Arc<dyn AccountStore>) -> Self {
        Self { accounts }
    }

    /// Create an account with a hashed password and the default role.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Account, ApiError> {
        let existing = self
            .accounts
            .find_by_email(email)
            .await
            .map_err(store_internal)?;
        if existing.is_some() {
            return Err(ApiError::DuplicateIdentity);
        }

        let account = Account::new(
            email.to_string(),
            name.to_string(),
            hash_secret(password)?,
        );

        match self.accounts.create(account).await {
            Ok(account) => Ok(account),
            Err(StoreError::Conflict) => Err(ApiError::DuplicateIdentity),
            Err(err) => Err(store_internal(err)),
        }
    }

    /// Check an email/password pair. Unknown email and wrong password are
    /// indistinguishable to the caller.
    pub async fn verify(&self, email: &str, password: &str) -> Result<Account, ApiError> {
        match self.check(email, password).await? {
            VerifyOutcome::Ok(account) => Ok(account),
            VerifyOutcome::UnknownEmail => {
                debug!("login failed: unknown email");
                Err(ApiError::InvalidCredentials)
            }
            VerifyOutcome::BadPassword => {
                debug!("login failed: password mismatch");
                Err(ApiError::InvalidCredentials)
            }
        }
    }

    async fn check(&self, email: &str, password: &str) -> Result<VerifyOutcome, ApiError> {
        let Some(account) = self
            .accounts
            .find_by_email(email)
            .await
            .map_err(store_internal)?
        else {
            return Ok(VerifyOutcome::UnknownEmail);
        };

        if verify_secret(password, &account.password_hash) {
            Ok(VerifyOutcome::Ok(account))
        } else {
            Ok(VerifyOutcome::BadPassword)
        }
    }
}

fn store_internal(err: StoreError) -> ApiError {
    ApiError::Internal(anyhow::anyhow!("account store failure: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryAccountStore;

    fn verifier() -> CredentialVerifier {
        CredentialVerifier::new(Arc::new(MemoryAccountStore::new()))
    }

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = match hash_secret("pw12345678") {
            Ok(hash) => hash,
            Err(err) => panic!("hash failed: {err}"),
        };
        assert!(verify_secret("pw12345678", &hash));
        assert!(!verify_secret("wrong", &hash));
    }

    #[test]
    fn malformed_stored_hash_is_a_mismatch() {
        assert!(!verify_secret("pw", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let verifier = verifier();
        let first = verifier
            .register("alice@example.com", "pw12345678", "Alice")
            .await;
        assert!(first.is_ok());

        let second = verifier
            .register("alice@example.com", "other-pass", "Alice Again")
            .await;
        assert!(matches!(second, Err(ApiError::DuplicateIdentity)));
    }

    #[tokio::test]
    async fn unknown_email_and_bad_password_are_indistinguishable() {
        let verifier = verifier();
        let _ = verifier
            .register("alice@example.com", "pw12345678", "Alice")
            .await;

        let unknown = verifier.verify("nobody@example.com", "pw12345678").await;
        let wrong = verifier.verify("alice@example.com", "bad-password").await;

        let unknown = unknown.err().map(|e| (e.kind(), e.to_string()));
        let wrong = wrong.err().map(|e| (e.kind(), e.to_string()));
        assert_eq!(unknown, wrong);
        assert_eq!(
            unknown,
            Some(("invalid_credentials", "Invalid credentials".to_string()))
        );
    }

    #[tokio::test]
    async fn verify_returns_account_on_match() {
        let verifier = verifier();
        let _ = verifier
            .register("alice@example.com", "pw12345678", "Alice")
            .await;

        let account = verifier.verify("alice@example.com", "pw12345678").await;
        assert_eq!(
            account.ok().map(|a| a.email),
            Some("alice@example.com".to_string())
        );
    }
}
