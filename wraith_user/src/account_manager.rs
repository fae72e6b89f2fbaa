//! # Account Manager
//!
//! The identity rules: registration, login, lookup, edit and removal of accounts, on top of
//! an [`IdentityStore`].
//!
//! ## Features
//!
//! * **Password handling**: passwords are replaced by their [`SaltedHash`] digest before
//!   anything is persisted, and compared only digest against digest
//! * **Encryption at rest**: with a [`Transmuter`] configured, records and queries are
//!   transmuted on the way into the store and reverted on the way out. The cipher is
//!   deterministic, so encrypted queries still match
//! * **Deadlines**: every store call is bounded by the configured timeout and fails with
//!   [`AccountError::StoreTimeout`] when exceeded
//!
//! ## Important Notes
//!
//! * Login and removal look records up by id, username, email and phone only. The password
//!   never takes part in the store filter
//! * The duplicate check before registration is best-effort. The store's own uniqueness
//!   constraint on `create` is what holds under concurrent registrations
//! * Values returned to callers are plaintext. Use [`Identity::sanitized`] before sending
//!   a record to a client
//!
//! ## Related Components
//!
//! * [`ResetManager`](crate::reset::ResetManager): password reset built on this manager
//! * [`SessionManager`](crate::session::SessionManager): session tokens for logged-in
//!   identities

use crate::backend::{self, IdentityStore, PersistenceHandler};
use crate::credentials::CredentialRequirements;
use crate::identity::Identity;
use crate::misc::AccountError;
use chrono::Utc;
use std::future::Future;
use std::time::Duration;
use wraith_crypt::hash::SaltedHash;
use wraith_crypt::transmute::Transmuter;

/// Applies the identity rules against a store. Cheap to clone
#[derive(Clone)]
pub struct AccountManager {
    identities: PersistenceHandler<dyn IdentityStore>,
    hasher: SaltedHash,
    transmuter: Option<Transmuter>,
    requirements: Option<CredentialRequirements>,
    store_timeout: Duration,
}

impl AccountManager {
    /// `hasher`: keyed with the password secret
    /// `transmuter`: `Some` to encrypt identities at rest
    /// `requirements`: `Some` to enforce username and password formats on registration
    pub fn new(
        identities: PersistenceHandler<dyn IdentityStore>,
        hasher: SaltedHash,
        transmuter: Option<Transmuter>,
        requirements: Option<CredentialRequirements>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            identities,
            hasher,
            transmuter,
            requirements,
            store_timeout,
        }
    }

    /// Creates a new identity from `candidate`, whose `password_digest` carries the raw
    /// password. Returns the stored identity without its digest
    pub async fn register(&self, candidate: Identity) -> Result<Identity, AccountError> {
        if let Some(requirements) = &self.requirements {
            requirements.check(&candidate.username, &candidate.password_digest)?;
        }

        let duplicates = self
            .with_deadline(
                self.identities
                    .find_duplicates(&self.seal(&candidate.uniqueness_key())?),
            )
            .await?;

        if !duplicates.is_empty() {
            log::trace!(target: "wraith", "Registration refused: {} conflicting record(s)", duplicates.len());
            return Err(AccountError::AlreadyExists);
        }

        let now = Utc::now();
        let mut record = candidate;
        if record.id.is_empty() {
            record.id = uuid::Uuid::new_v4().to_string();
        }
        record.password_digest = self.hasher.digest(&record.password_digest);
        record.created_at = Some(now);
        record.updated_at = Some(now);

        self.with_deadline(self.identities.create(&self.seal(&record)?))
            .await?;

        log::info!(target: "wraith", "Registered identity {}", record.id);
        Ok(record.sanitized())
    }

    /// Verifies `credentials` (an id, username, email or phone, plus the raw password in
    /// `password_digest`) and returns the matching identity, digest included
    pub async fn login(&self, credentials: &Identity) -> Result<Identity, AccountError> {
        let record = self
            .fetch(&credentials.lookup_key())
            .await?
            .ok_or(AccountError::NotFound)?;

        if !self
            .hasher
            .verify(&credentials.password_digest, &record.password_digest)
        {
            log::trace!(target: "wraith", "Incorrect password for identity {}", record.id);
            return Err(AccountError::IncorrectPassword);
        }

        Ok(record)
    }

    /// Returns the identity selected by the id, username, email or phone of `query`, without
    /// its digest
    pub async fn get(&self, query: &Identity) -> Result<Identity, AccountError> {
        self.fetch(&query.lookup_key())
            .await?
            .map(|record| record.sanitized())
            .ok_or(AccountError::NotFound)
    }

    /// Merge-patches the identity whose id equals `patch.id`. Empty fields are left as they
    /// are; a non-empty `password_digest` carries a new raw password and is hashed first
    pub async fn edit(&self, patch: &Identity) -> Result<(), AccountError> {
        if patch.id.is_empty() {
            return Err(AccountError::invalid_request("an id is required"));
        }

        let mut patch = patch.clone();
        if !patch.password_digest.is_empty() {
            patch.password_digest = self.hasher.digest(&patch.password_digest);
        }
        patch.created_at = None;
        patch.updated_at = Some(Utc::now());

        let sealed = self.seal(&patch)?;
        let uniqueness_key = sealed.uniqueness_key();
        if !uniqueness_key.is_empty_query() {
            let duplicates = self
                .with_deadline(self.identities.find_duplicates(&uniqueness_key))
                .await?;
            if duplicates.iter().any(|record| record.id != sealed.id) {
                return Err(AccountError::AlreadyExists);
            }
        }

        self.with_deadline(self.identities.update(&sealed)).await?;
        log::trace!(target: "wraith", "Updated identity {}", patch.id);
        Ok(())
    }

    /// Verifies `credentials` like [`Self::login`], then hard-deletes the identity
    pub async fn remove(&self, credentials: &Identity) -> Result<(), AccountError> {
        let record = self.login(credentials).await?;
        let stored_id = self
            .seal(&Identity {
                id: record.id.clone(),
                ..Default::default()
            })?
            .id;

        self.with_deadline(self.identities.delete(&stored_id))
            .await?;
        log::info!(target: "wraith", "Removed identity {}", record.id);
        Ok(())
    }

    /// The hasher account passwords are digested with
    pub fn hasher(&self) -> &SaltedHash {
        &self.hasher
    }

    /// Looks up one identity by a sparse plaintext query, returning it decrypted
    pub(crate) async fn fetch(&self, query: &Identity) -> Result<Option<Identity>, AccountError> {
        if query.is_empty_query() {
            return Err(AccountError::invalid_request(
                "an id, username, email or phone is required",
            ));
        }

        let sealed = self.seal(query)?;
        match self.with_deadline(self.identities.get(&sealed)).await? {
            Some(record) => Ok(Some(self.open(&record)?)),
            None => Ok(None),
        }
    }

    fn seal(&self, identity: &Identity) -> Result<Identity, AccountError> {
        match &self.transmuter {
            Some(transmuter) => Ok(transmuter.transmute(identity)?),
            None => Ok(identity.clone()),
        }
    }

    fn open(&self, identity: &Identity) -> Result<Identity, AccountError> {
        match &self.transmuter {
            Some(transmuter) => Ok(transmuter.revert(identity)?),
            None => Ok(identity.clone()),
        }
    }

    async fn with_deadline<F, T>(&self, task: F) -> Result<T, AccountError>
    where
        F: Future<Output = Result<T, AccountError>>,
    {
        backend::with_deadline(self.store_timeout, task).await
    }
}

#[cfg(test)]
mod tests {
    use super::AccountManager;
    use crate::backend::memory::MemoryBackend;
    use crate::backend::{self, IdentityStore, PersistenceHandler};
    use crate::credentials::CredentialRequirements;
    use crate::identity::Identity;
    use crate::misc::AccountError;
    use std::sync::Arc;
    use std::time::Duration;
    use wraith_crypt::cipher::KeyedCipher;
    use wraith_crypt::hash::SaltedHash;
    use wraith_crypt::transmute::Transmuter;

    fn manager(encrypt: bool) -> (AccountManager, Arc<MemoryBackend>) {
        manager_with(encrypt, None)
    }

    fn manager_with(
        encrypt: bool,
        requirements: Option<CredentialRequirements>,
    ) -> (AccountManager, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::default());
        let store: Arc<dyn IdentityStore> = backend.clone();
        let transmuter = encrypt.then(|| Transmuter::new(KeyedCipher::new("db-secret").unwrap()));
        let manager = AccountManager::new(
            PersistenceHandler::new(store),
            SaltedHash::new("password-secret").unwrap(),
            transmuter,
            requirements,
            Duration::from_secs(5),
        );
        (manager, backend)
    }

    fn candidate() -> Identity {
        Identity {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            phone: "+15550100".to_string(),
            display_name: "Alice".to_string(),
            password_digest: "hunter22".to_string(),
            ..Default::default()
        }
    }

    fn credentials(password: &str) -> Identity {
        Identity {
            email: "alice@example.com".to_string(),
            password_digest: password.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        wraith_logging::setup_log_no_panic_hook();
        let (manager, backend) = manager(false);
        let registered = manager.register(candidate()).await.unwrap();
        assert!(!registered.id.is_empty());
        assert!(registered.password_digest.is_empty());
        assert!(registered.created_at.is_some());

        let stored = &backend.identities()[0];
        assert_ne!(stored.password_digest, "hunter22");
        assert!(manager.hasher().verify("hunter22", &stored.password_digest));

        let logged_in = manager.login(&credentials("hunter22")).await.unwrap();
        assert_eq!(logged_in.id, registered.id);
        assert!(matches!(
            manager.login(&credentials("hunter23")).await,
            Err(AccountError::IncorrectPassword)
        ));
    }

    #[tokio::test]
    async fn login_unknown_and_empty_query() {
        let (manager, _) = manager(false);
        assert!(matches!(
            manager.login(&credentials("hunter22")).await,
            Err(AccountError::NotFound)
        ));

        let password_only = Identity {
            password_digest: "hunter22".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            manager.login(&password_only).await,
            Err(AccountError::InvalidRequest(..))
        ));
    }

    #[tokio::test]
    async fn register_rejects_bad_format() {
        let (manager, backend) = manager_with(false, Some(CredentialRequirements::default()));
        let mut bad = candidate();
        bad.password_digest = "abc".to_string();
        assert!(matches!(
            manager.register(bad).await,
            Err(AccountError::InvalidCredentials(..))
        ));
        assert!(backend.identities().is_empty());
    }

    #[tokio::test]
    async fn formats_are_not_checked_unless_configured() {
        let (manager, backend) = manager(false);
        let bare = Identity {
            username: "bob".to_string(),
            ..Default::default()
        };

        let registered = manager.register(bare.clone()).await.unwrap();
        assert_eq!(registered.username, "bob");
        assert!(matches!(
            manager.register(bare).await,
            Err(AccountError::AlreadyExists)
        ));
        assert_eq!(backend.identities().len(), 1);
    }

    #[tokio::test]
    async fn encrypted_at_rest_still_queryable() {
        let (manager, backend) = manager(true);
        let registered = manager.register(candidate()).await.unwrap();

        let stored = &backend.identities()[0];
        assert_ne!(stored.email, "alice@example.com");
        assert_ne!(stored.username, "alice");
        assert_ne!(stored.id, registered.id);

        let fetched = manager
            .get(&Identity {
                phone: "+15550100".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(fetched.email, "alice@example.com");
        assert_eq!(fetched.id, registered.id);
        assert!(fetched.password_digest.is_empty());

        let logged_in = manager.login(&credentials("hunter22")).await.unwrap();
        assert_eq!(logged_in.id, registered.id);
        assert!(matches!(
            manager.register(candidate()).await,
            Err(AccountError::AlreadyExists)
        ));
    }

    #[tokio::test]
    async fn edit_merges_and_rehashes() {
        let (manager, _) = manager(true);
        let registered = manager.register(candidate()).await.unwrap();

        manager
            .edit(&Identity {
                id: registered.id.clone(),
                display_name: "Alice L.".to_string(),
                password_digest: "newpass1".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let logged_in = manager.login(&credentials("newpass1")).await.unwrap();
        assert_eq!(logged_in.display_name, "Alice L.");
        assert_eq!(logged_in.username, "alice");
        assert_eq!(logged_in.phone, "+15550100");
        assert!(matches!(
            manager.login(&credentials("hunter22")).await,
            Err(AccountError::IncorrectPassword)
        ));

        assert!(matches!(
            manager.edit(&Identity::default()).await,
            Err(AccountError::InvalidRequest(..))
        ));
        assert!(matches!(
            manager
                .edit(&Identity {
                    id: "missing".to_string(),
                    display_name: "x".to_string(),
                    ..Default::default()
                })
                .await,
            Err(AccountError::NotFound)
        ));
    }

    #[tokio::test]
    async fn edit_cannot_take_anothers_email() {
        let (manager, _) = manager(false);
        let _ = manager.register(candidate()).await.unwrap();
        let bob = manager
            .register(Identity {
                username: "bob".to_string(),
                email: "bob@example.com".to_string(),
                password_digest: "hunter22".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(matches!(
            manager
                .edit(&Identity {
                    id: bob.id.clone(),
                    email: "alice@example.com".to_string(),
                    ..Default::default()
                })
                .await,
            Err(AccountError::AlreadyExists)
        ));

        manager
            .edit(&Identity {
                id: bob.id,
                email: "bob@example.com".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn remove_requires_password() {
        let (manager, backend) = manager(true);
        let _ = manager.register(candidate()).await.unwrap();

        assert!(matches!(
            manager.remove(&credentials("wrongpass")).await,
            Err(AccountError::IncorrectPassword)
        ));
        assert_eq!(backend.identities().len(), 1);

        manager.remove(&credentials("hunter22")).await.unwrap();
        assert!(backend.identities().is_empty());
        assert!(matches!(
            manager.get(&credentials("")).await,
            Err(AccountError::NotFound)
        ));
    }
}
