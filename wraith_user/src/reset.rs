//! # Password Reset
//!
//! Two steps, joined by a short-lived envelope token:
//!
//! ```text
//! start(email/phone) ──> ResetTicket { token, .. } ──(delivered out of band)──>
//! validate(ResetTicket { token, new_password }) ──> ResetTicket { id, token }
//! ```
//!
//! Validation runs the [`ResetPolicy`] on the token's claims: the token must be a reset
//! token, its identity must still exist, and the proposed password must differ from the
//! current one. Validation never writes. The caller sets the password through
//! [`AccountManager::edit`] with the returned id.

use crate::account_manager::AccountManager;
use crate::identity::Identity;
use crate::misc::AccountError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use std::time::Duration;
use wraith_crypt::envelope::{ClaimsPolicy, EnvelopeToken, PolicyError};

/// A reset request and, once validated, its outcome
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ResetTicket {
    pub id: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    /// Accepted inbound only. Never serialized
    #[serde(skip_serializing)]
    pub new_password: String,
    pub token: String,
}

impl Debug for ResetTicket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetTicket")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .finish_non_exhaustive()
    }
}

/// The claims carried by a reset token
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ResetClaims {
    pub id: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub reset: bool,
}

/// Accepts reset claims whose identity still exists and whose proposed password is new.
/// Yields the current identity
pub(crate) struct ResetPolicy<'a> {
    accounts: &'a AccountManager,
    new_password: &'a str,
}

#[async_trait]
impl<'a> ClaimsPolicy<ResetClaims> for ResetPolicy<'a> {
    type Output = Identity;

    async fn check(&self, claims: ResetClaims) -> Result<Identity, PolicyError> {
        if !claims.reset {
            return Err(Box::new(AccountError::TokenRejected(
                "not a reset token".to_string(),
            )));
        }

        let query = Identity {
            email: claims.email,
            phone: claims.phone,
            ..Default::default()
        };

        let record = self
            .accounts
            .fetch(&query)
            .await?
            .ok_or(AccountError::NotFound)?;

        if self
            .accounts
            .hasher()
            .verify(self.new_password, &record.password_digest)
        {
            return Err(Box::new(AccountError::SamePassword));
        }

        Ok(record)
    }
}

/// Issues and validates reset tickets
#[derive(Clone)]
pub struct ResetManager {
    accounts: AccountManager,
    tokens: EnvelopeToken,
    ttl: Duration,
}

impl ResetManager {
    pub fn new(accounts: AccountManager, tokens: EnvelopeToken, ttl: Duration) -> Self {
        Self {
            accounts,
            tokens,
            ttl,
        }
    }

    /// Resolves the identity by the email and/or phone of `request` and mints its reset token
    pub async fn start(&self, request: &ResetTicket) -> Result<ResetTicket, AccountError> {
        if request.email.is_empty() && request.phone.is_empty() {
            return Err(AccountError::invalid_request("an email or phone is required"));
        }

        let query = Identity {
            email: request.email.clone(),
            phone: request.phone.clone(),
            ..Default::default()
        };

        let record = self
            .accounts
            .fetch(&query)
            .await?
            .ok_or(AccountError::NotFound)?;

        let claims = ResetClaims {
            id: record.id.clone(),
            email: record.email.clone(),
            phone: record.phone.clone(),
            reset: true,
        };

        let token = self.tokens.issue(self.ttl, &claims)?;
        log::trace!(target: "wraith", "Reset started for identity {}", record.id);

        Ok(ResetTicket {
            id: record.id,
            username: record.username,
            email: record.email,
            phone: record.phone,
            new_password: String::new(),
            token,
        })
    }

    /// Checks `ticket.token`, returning the identity id together with the original token.
    /// A ticket without `new_password` only checks the token
    pub async fn validate(&self, ticket: &ResetTicket) -> Result<ResetTicket, AccountError> {
        let policy = ResetPolicy {
            accounts: &self.accounts,
            new_password: &ticket.new_password,
        };

        let record = self
            .tokens
            .validate::<ResetClaims, _>(&ticket.token, &policy)
            .await?;

        Ok(ResetTicket {
            id: record.id,
            token: ticket.token.clone(),
            ..Default::default()
        })
    }
}
