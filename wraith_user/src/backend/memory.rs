use crate::backend::{IdentityStore, LicenseStore, OperatorStore};
use crate::guard::OperatorCredential;
use crate::identity::Identity;
use crate::license::License;
use crate::misc::AccountError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Stores identities, operators and licenses in process memory
#[derive(Default)]
pub struct MemoryBackend {
    pub(crate) identities: RwLock<Vec<Identity>>,
    pub(crate) operators: RwLock<HashMap<String, OperatorCredential>>,
    pub(crate) licenses: RwLock<HashMap<String, License>>,
}

impl MemoryBackend {
    /// Adds or replaces an operator
    #[allow(unused_results)]
    pub fn insert_operator(&self, operator: OperatorCredential) {
        self.operators
            .write()
            .insert(operator.username.clone(), operator);
    }

    /// Adds or replaces a license
    #[allow(unused_results)]
    pub fn insert_license(&self, license: License) {
        self.licenses.write().insert(license.key.clone(), license);
    }

    /// Every stored identity, exactly as persisted
    pub fn identities(&self) -> Vec<Identity> {
        self.identities.read().clone()
    }
}

#[async_trait]
impl IdentityStore for MemoryBackend {
    async fn get(&self, query: &Identity) -> Result<Option<Identity>, AccountError> {
        Ok(self
            .identities
            .read()
            .iter()
            .find(|record| record.matches(query))
            .cloned())
    }

    async fn create(&self, identity: &Identity) -> Result<(), AccountError> {
        let mut write = self.identities.write();
        if write
            .iter()
            .any(|record| record.id == identity.id || record.collides_with(identity))
        {
            return Err(AccountError::AlreadyExists);
        }

        write.push(identity.clone());
        Ok(())
    }

    async fn update(&self, patch: &Identity) -> Result<(), AccountError> {
        let mut write = self.identities.write();
        let record = write
            .iter_mut()
            .find(|record| record.id == patch.id)
            .ok_or(AccountError::NotFound)?;
        record.merge(patch);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), AccountError> {
        let mut write = self.identities.write();
        let idx = write
            .iter()
            .position(|record| record.id == id)
            .ok_or(AccountError::NotFound)?;
        let _ = write.remove(idx);
        Ok(())
    }

    async fn find_duplicates(&self, candidate: &Identity) -> Result<Vec<Identity>, AccountError> {
        Ok(self
            .identities
            .read()
            .iter()
            .filter(|record| record.collides_with(candidate))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OperatorStore for MemoryBackend {
    async fn get_operator(
        &self,
        username: &str,
    ) -> Result<Option<OperatorCredential>, AccountError> {
        Ok(self.operators.read().get(username).cloned())
    }
}

#[async_trait]
impl LicenseStore for MemoryBackend {
    async fn get_license(&self, key: &str) -> Result<Option<License>, AccountError> {
        Ok(self.licenses.read().get(key).cloned())
    }
}
