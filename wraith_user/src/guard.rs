//! # Credential Gate
//!
//! [`Manticore`] guards the internal routes: a request passes only if it names a known
//! operator and presents that operator's password. Operator digests are produced by a
//! [`SaltedHash`] keyed with the internals secret, separate from the one used for account
//! passwords.

use crate::backend::{self, OperatorStore, PersistenceHandler};
use crate::misc::AccountError;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use std::time::Duration;
use wraith_crypt::hash::SaltedHash;

/// A stored operator
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct OperatorCredential {
    pub username: String,
    #[serde(rename = "password")]
    pub password_digest: String,
}

impl Debug for OperatorCredential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorCredential")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Checks operator credentials against the [`OperatorStore`]
#[derive(Clone)]
pub struct Manticore {
    operators: PersistenceHandler<dyn OperatorStore>,
    hasher: SaltedHash,
    store_timeout: Duration,
}

impl Manticore {
    /// `store_timeout` bounds every operator lookup
    pub fn new(
        operators: PersistenceHandler<dyn OperatorStore>,
        hasher: SaltedHash,
        store_timeout: Duration,
    ) -> Self {
        Self {
            operators,
            hasher,
            store_timeout,
        }
    }

    /// Produces the record to store for a new operator
    pub fn enroll<T: Into<String>>(&self, username: T, password: &str) -> OperatorCredential {
        OperatorCredential {
            username: username.into(),
            password_digest: self.hasher.digest(password),
        }
    }

    /// Succeeds only if `username` names an operator whose stored digest matches `password`
    pub async fn authorize(&self, username: &str, password: &str) -> Result<(), AccountError> {
        let operator =
            backend::with_deadline(self.store_timeout, self.operators.get_operator(username))
                .await?
                .ok_or(AccountError::NotFound)?;

        if !self.hasher.verify(password, &operator.password_digest) {
            log::warn!(target: "wraith", "Credential gate refused operator {}", username);
            return Err(AccountError::IncorrectPassword);
        }

        log::trace!(target: "wraith", "Credential gate admitted operator {}", username);
        Ok(())
    }
}
