//! # Configuration
//!
//! [`WraithConfig`] holds everything a node needs at startup: the secrets, feature switches,
//! token lifetimes and the store deadline. It is read from a JSON file; secrets may instead
//! come from the environment via [`Secrets::from_env`].
//!
//! ```json
//! {
//!   "options": { "encrypt_db_data": true, "encrypt_response": false, "use_license": true },
//!   "license_key": "LIC-0001",
//!   "session_ttl_minutes": 60,
//!   "reset_ttl_minutes": 10,
//!   "store_timeout_ms": 5000
//! }
//! ```
//!
//! ## Important Notes
//!
//! * Every secret must be distinct. Reusing one secret for two purposes is a configuration
//!   error
//! * [`Secrets`] never prints its values through `Debug`

use crate::credentials::CredentialRequirements;
use crate::misc::AccountError;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the keyword the API key is derived from
pub const ENV_KEY_WORD: &str = "SERVER_KEY_WORD";
/// Environment variable holding the token signing secret
pub const ENV_SECRET_JWT: &str = "SECRET_JWT";
/// Environment variable holding the at-rest encryption secret
pub const ENV_SECRET_DB: &str = "SECRET_DB";
/// Environment variable holding the account password hash secret
pub const ENV_SECRET_PASSWORD: &str = "SECRET_PASSWORD";
/// Environment variable holding the operator password hash secret
pub const ENV_SECRET_INTERNALS: &str = "SECRET_INTERNALS";
/// Environment variable holding the response encryption secret
pub const ENV_SECRET_RESPONSE: &str = "SECRET_RESPONSE";

/// The long-lived secrets. Each one keys exactly one component
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Secrets {
    pub key_word: String,
    pub jwt: String,
    pub db_data: String,
    pub password: String,
    pub internals: String,
    pub response: String,
}

impl Secrets {
    /// Reads every secret from its environment variable. Unset variables are left empty and
    /// caught by [`WraithConfig::validate`]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the secrets from any name lookup
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let read = |name: &str| lookup(name).unwrap_or_default();
        Self {
            key_word: read(ENV_KEY_WORD),
            jwt: read(ENV_SECRET_JWT),
            db_data: read(ENV_SECRET_DB),
            password: read(ENV_SECRET_PASSWORD),
            internals: read(ENV_SECRET_INTERNALS),
            response: read(ENV_SECRET_RESPONSE),
        }
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Debug for Secrets {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secrets { .. }")
    }
}

/// Feature switches
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Options {
    /// Transmute identities before they reach the store
    pub encrypt_db_data: bool,
    /// Encrypt response bodies with the response secret
    pub encrypt_response: bool,
    /// Require a valid license at startup
    pub use_license: bool,
}

/// Node configuration
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct WraithConfig {
    pub secrets: Secrets,
    pub options: Options,
    pub license_key: String,
    pub session_ttl_minutes: u64,
    pub reset_ttl_minutes: u64,
    pub store_timeout_ms: u64,
    /// Username and password formats enforced on registration. Unchecked when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_requirements: Option<CredentialRequirements>,
}

impl Default for WraithConfig {
    fn default() -> Self {
        Self {
            secrets: Secrets::default(),
            options: Options::default(),
            license_key: String::new(),
            session_ttl_minutes: DEFAULT_SESSION_TTL_MINUTES,
            reset_ttl_minutes: DEFAULT_RESET_TTL_MINUTES,
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
            credential_requirements: None,
        }
    }
}

impl WraithConfig {
    /// Parses a JSON configuration file. When the file carries no secrets they are read from
    /// the environment
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, AccountError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|err| {
            AccountError::config(format!("Unable to read {}: {err}", path.display()))
        })?;

        let mut config = Self::from_json(&raw)?;
        if config.secrets.is_empty() {
            log::debug!(target: "wraith", "No secrets in {}, reading environment", path.display());
            config.secrets = Secrets::from_env();
        }

        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self, AccountError> {
        serde_json::from_str(raw)
            .map_err(|err| AccountError::config(format!("Invalid configuration: {err}")))
    }

    /// Rejects missing or reused secrets, lifetimes outside `1..=MAX_TOKEN_TTL_MINUTES`, and
    /// a missing license key when licensing is enabled
    pub fn validate(&self) -> Result<(), AccountError> {
        let mut required = vec![
            (ENV_KEY_WORD, &self.secrets.key_word),
            (ENV_SECRET_JWT, &self.secrets.jwt),
            (ENV_SECRET_PASSWORD, &self.secrets.password),
            (ENV_SECRET_INTERNALS, &self.secrets.internals),
        ];

        if self.options.encrypt_db_data {
            required.push((ENV_SECRET_DB, &self.secrets.db_data));
        }

        if self.options.encrypt_response {
            required.push((ENV_SECRET_RESPONSE, &self.secrets.response));
        }

        for (idx, (name, value)) in required.iter().enumerate() {
            if value.is_empty() {
                return Err(AccountError::config(format!("{name} is not set")));
            }

            if let Some((other, _)) = required[..idx].iter().find(|(_, prev)| prev == value) {
                return Err(AccountError::config(format!(
                    "{name} must differ from {other}"
                )));
            }
        }

        if self.session_ttl_minutes == 0 || self.reset_ttl_minutes == 0 {
            return Err(AccountError::config("Token lifetimes must be non-zero"));
        }

        if self.session_ttl_minutes > MAX_TOKEN_TTL_MINUTES
            || self.reset_ttl_minutes > MAX_TOKEN_TTL_MINUTES
        {
            return Err(AccountError::config(format!(
                "Token lifetimes may not exceed {MAX_TOKEN_TTL_MINUTES} minutes"
            )));
        }

        if self.store_timeout_ms == 0 {
            return Err(AccountError::config("Store timeout must be non-zero"));
        }

        if self.options.use_license && self.license_key.is_empty() {
            return Err(AccountError::config(
                "A license key is required when licensing is enabled",
            ));
        }

        Ok(())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_minutes.saturating_mul(60))
    }

    pub fn reset_ttl(&self) -> Duration {
        Duration::from_secs(self.reset_ttl_minutes.saturating_mul(60))
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

///
pub const DEFAULT_SESSION_TTL_MINUTES: u64 = 60;
///
pub const DEFAULT_RESET_TTL_MINUTES: u64 = 10;
///
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;
/// One year
pub const MAX_TOKEN_TTL_MINUTES: u64 = 60 * 24 * 366;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn secrets() -> Secrets {
        Secrets {
            key_word: "keyword".to_string(),
            jwt: "jwt-secret".to_string(),
            db_data: "db-secret".to_string(),
            password: "password-secret".to_string(),
            internals: "internals-secret".to_string(),
            response: "response-secret".to_string(),
        }
    }

    #[test]
    fn defaults() {
        let config = WraithConfig::from_json("{}").unwrap();
        assert_eq!(config.reset_ttl(), Duration::from_secs(600));
        assert_eq!(config.session_ttl(), Duration::from_secs(3600));
        assert!(!config.options.encrypt_db_data);
        assert!(config.credential_requirements.is_none());
        assert!(config.validate().is_err());
    }

    #[rstest]
    #[case(MAX_TOKEN_TTL_MINUTES, DEFAULT_RESET_TTL_MINUTES, true)]
    #[case(MAX_TOKEN_TTL_MINUTES + 1, DEFAULT_RESET_TTL_MINUTES, false)]
    #[case(DEFAULT_SESSION_TTL_MINUTES, u64::MAX, false)]
    #[case(0, DEFAULT_RESET_TTL_MINUTES, false)]
    fn token_lifetimes_are_bounded(
        #[case] session_ttl_minutes: u64,
        #[case] reset_ttl_minutes: u64,
        #[case] accepted: bool,
    ) {
        let config = WraithConfig {
            secrets: secrets(),
            session_ttl_minutes,
            reset_ttl_minutes,
            ..Default::default()
        };
        assert_eq!(config.validate().is_ok(), accepted);
        assert_eq!(
            config.session_ttl(),
            Duration::from_secs(session_ttl_minutes.saturating_mul(60))
        );
    }

    #[test]
    fn credential_requirements_are_opt_in() {
        let config =
            WraithConfig::from_json(r#"{"credential_requirements": {"min_password_length": 12}}"#)
                .unwrap();
        let requirements = config.credential_requirements.unwrap();
        assert_eq!(requirements.min_password_length, 12);
        assert_eq!(
            requirements.max_username_length,
            CredentialRequirements::default().max_username_length
        );
    }

    #[test]
    fn validate_accepts_distinct_secrets() {
        let config = WraithConfig {
            secrets: secrets(),
            options: Options {
                encrypt_db_data: true,
                encrypt_response: true,
                use_license: false,
            },
            ..Default::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_reused_secret() {
        let mut config = WraithConfig {
            secrets: secrets(),
            ..Default::default()
        };
        config.secrets.internals = config.secrets.password.clone();

        match config.validate() {
            Err(AccountError::Config(msg)) => {
                assert!(msg.contains(ENV_SECRET_INTERNALS));
                assert!(!msg.contains("password-secret"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_missing_secret_only_when_needed() {
        let mut config = WraithConfig {
            secrets: secrets(),
            ..Default::default()
        };
        config.secrets.db_data.clear();
        config.validate().unwrap();

        config.options.encrypt_db_data = true;
        assert!(matches!(config.validate(), Err(AccountError::Config(..))));
    }

    #[test]
    fn license_key_required_when_licensing() {
        let mut config = WraithConfig {
            secrets: secrets(),
            ..Default::default()
        };
        config.options.use_license = true;
        assert!(config.validate().is_err());
        config.license_key = "LIC-1".to_string();
        config.validate().unwrap();
    }

    #[test]
    fn secrets_from_lookup() {
        let env: HashMap<&str, &str> = [(ENV_SECRET_JWT, "a"), (ENV_KEY_WORD, "b")]
            .into_iter()
            .collect();
        let secrets = Secrets::from_lookup(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(secrets.jwt, "a");
        assert_eq!(secrets.key_word, "b");
        assert!(secrets.password.is_empty());
        assert_eq!(format!("{secrets:?}"), "Secrets { .. }");
    }

    #[tokio::test]
    async fn missing_file_is_config_error() {
        assert!(matches!(
            WraithConfig::load_from_file("/nonexistent/wraith.json").await,
            Err(AccountError::Config(..))
        ));
    }
}
