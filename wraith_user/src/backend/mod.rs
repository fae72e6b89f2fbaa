use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::guard::OperatorCredential;
use crate::identity::Identity;
use crate::license::License;
use crate::misc::AccountError;

/// Implementation for an in-memory backend. Data is lost when the process exits.
/// This is useful for tests and embedded use
pub mod memory;

/// The entity store holding identities. Records arrive exactly as they should be persisted
/// (already transmuted when encryption at rest is enabled), and every query follows the
/// sparse convention of [`Identity::matches`]
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Returns the first record matching every populated field of `query`
    async fn get(&self, query: &Identity) -> Result<Option<Identity>, AccountError>;
    /// Persists a new record. Fails with [`AccountError::AlreadyExists`] when another record
    /// holds the same username, email or phone
    async fn create(&self, identity: &Identity) -> Result<(), AccountError>;
    /// Merge-patches the record whose id equals `patch.id`
    async fn update(&self, patch: &Identity) -> Result<(), AccountError>;
    /// Hard-deletes the record with this id
    async fn delete(&self, id: &str) -> Result<(), AccountError>;
    /// Returns every record sharing a populated username, email or phone with `candidate`
    async fn find_duplicates(&self, candidate: &Identity) -> Result<Vec<Identity>, AccountError>;
}

/// Storage of the operators allowed past the credential gate
#[async_trait]
pub trait OperatorStore: Send + Sync {
    /// Finds an operator by exact username
    async fn get_operator(&self, username: &str)
        -> Result<Option<OperatorCredential>, AccountError>;
}

/// Storage of product licenses
#[async_trait]
pub trait LicenseStore: Send + Sync {
    /// Finds a license by exact key
    async fn get_license(&self, key: &str) -> Result<Option<License>, AccountError>;
}

/// A cheaply cloneable handle to whichever stores the node was given
pub struct PersistenceHandler<T: ?Sized> {
    inner: Arc<T>,
}

impl<T: ?Sized> PersistenceHandler<T> {
    pub fn new(inner: Arc<T>) -> Self {
        Self { inner }
    }
}

impl<T: ?Sized> Deref for PersistenceHandler<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T: ?Sized> Clone for PersistenceHandler<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// The three stores a node needs
#[derive(Clone)]
pub struct Stores {
    pub identities: PersistenceHandler<dyn IdentityStore>,
    pub operators: PersistenceHandler<dyn OperatorStore>,
    pub licenses: PersistenceHandler<dyn LicenseStore>,
}

impl Stores {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        operators: Arc<dyn OperatorStore>,
        licenses: Arc<dyn LicenseStore>,
    ) -> Self {
        Self {
            identities: PersistenceHandler::new(identities),
            operators: PersistenceHandler::new(operators),
            licenses: PersistenceHandler::new(licenses),
        }
    }

    /// Uses one in-memory backend for all three stores
    pub fn in_memory(backend: Arc<memory::MemoryBackend>) -> Self {
        Self::new(backend.clone(), backend.clone(), backend)
    }
}

/// Bounds a store call by `timeout`, failing with [`AccountError::StoreTimeout`]
pub(crate) async fn with_deadline<F, T>(timeout: Duration, task: F) -> Result<T, AccountError>
where
    F: Future<Output = Result<T, AccountError>>,
{
    tokio::time::timeout(timeout, task).await.map_err(|_| {
        log::warn!(target: "wraith", "Store call exceeded {:?}", timeout);
        AccountError::StoreTimeout
    })?
}
