//! # Node Bootstrap
//!
//! [`WraithNode::bootstrap`] turns a [`WraithConfig`] and a set of [`Stores`] into the
//! running set of components, each keyed with its own secret:
//!
//! ```text
//! key_word  ──> ApiKey            (every public route)
//! jwt       ──> EnvelopeToken     (sessions, resets)
//! password  ──> SaltedHash        (account passwords)
//! internals ──> SaltedHash        (operator passwords, Manticore)
//! db_data   ──> KeyedCipher       (encryption at rest, optional)
//! response  ──> KeyedCipher       (response bodies, optional)
//! ```
//!
//! Bootstrap fails, and the process should not start serving, when the configuration is
//! invalid or licensing is enabled and the license does not activate.

use crate::account_manager::AccountManager;
use crate::backend::{self, Stores};
use crate::config::WraithConfig;
use crate::guard::Manticore;
use crate::license::{self, License};
use crate::misc::AccountError;
use crate::reset::ResetManager;
use crate::session::SessionManager;
use serde::Serialize;
use wraith_crypt::apikey::ApiKey;
use wraith_crypt::cipher::KeyedCipher;
use wraith_crypt::envelope::EnvelopeToken;
use wraith_crypt::hash::SaltedHash;
use wraith_crypt::transmute::Transmuter;

/// Every component of a running node
#[derive(Clone)]
pub struct WraithNode {
    api_key: ApiKey,
    accounts: AccountManager,
    resets: ResetManager,
    sessions: SessionManager,
    gate: Manticore,
    response_cipher: Option<KeyedCipher>,
    license: Option<License>,
}

impl WraithNode {
    /// Validates `config`, activates the license when enabled, and wires every component
    pub async fn bootstrap(config: &WraithConfig, stores: Stores) -> Result<Self, AccountError> {
        config.validate()?;
        let secrets = &config.secrets;

        let license = if config.options.use_license {
            Some(
                backend::with_deadline(
                    config.store_timeout(),
                    license::activate(&**stores.licenses, &config.license_key),
                )
                .await?,
            )
        } else {
            None
        };

        let transmuter = if config.options.encrypt_db_data {
            Some(Transmuter::new(KeyedCipher::new(&secrets.db_data)?))
        } else {
            None
        };

        let response_cipher = if config.options.encrypt_response {
            Some(KeyedCipher::new(&secrets.response)?)
        } else {
            None
        };

        let tokens = EnvelopeToken::new(&secrets.jwt)?;

        let accounts = AccountManager::new(
            stores.identities.clone(),
            SaltedHash::new(&secrets.password)?,
            transmuter,
            config.credential_requirements.clone(),
            config.store_timeout(),
        );

        let resets = ResetManager::new(accounts.clone(), tokens.clone(), config.reset_ttl());
        let sessions = SessionManager::new(tokens, config.session_ttl());
        let gate = Manticore::new(
            stores.operators.clone(),
            SaltedHash::new(&secrets.internals)?,
            config.store_timeout(),
        );

        log::info!(target: "wraith", "Node ready (encrypt_db_data: {}, encrypt_response: {}, licensed: {})",
            config.options.encrypt_db_data,
            config.options.encrypt_response,
            license.is_some()
        );

        Ok(Self {
            api_key: ApiKey::derive(&secrets.key_word),
            accounts,
            resets,
            sessions,
            gate,
            response_cipher,
            license,
        })
    }

    /// Fails unless `presented` is the node's API key
    pub fn verify_api_key(&self, presented: &str) -> Result<(), AccountError> {
        if self.api_key.verify(presented) {
            Ok(())
        } else {
            Err(AccountError::InvalidCredentials(
                "invalid api key".to_string(),
            ))
        }
    }

    /// The body to send for `value`: sealed under the response secret when response
    /// encryption is enabled, plain JSON otherwise
    pub fn seal_response<T: Serialize + ?Sized>(
        &self,
        value: &T,
    ) -> Result<serde_json::Value, AccountError> {
        match &self.response_cipher {
            Some(cipher) => Ok(serde_json::Value::String(cipher.seal(value)?)),
            None => serde_json::to_value(value)
                .map_err(|err| AccountError::Backend(format!("Unable to encode response: {err}"))),
        }
    }

    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    pub fn accounts(&self) -> &AccountManager {
        &self.accounts
    }

    pub fn resets(&self) -> &ResetManager {
        &self.resets
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// The credential gate for internal routes
    pub fn gate(&self) -> &Manticore {
        &self.gate
    }

    /// The activated license, when licensing is enabled
    pub fn license(&self) -> Option<&License> {
        self.license.as_ref()
    }
}
