//! # Envelope Token
//!
//! Compact, signed, self-contained tokens carrying application claims and an expiry instant.
//! Used for both session authentication and password-reset authorization.
//!
//! ## Format
//!
//! A JWS in compact serialization, signed with HMAC-SHA256 (`HS256`), whose payload is
//!
//! ```text
//! { "data": <claims or null>, "exp": <unix seconds> }
//! ```
//!
//! ## Lifecycle
//!
//! ```text
//! issue ──> Valid ──(exp elapsed)──> Expired
//!             │
//!             └──(bad signature / policy rejection)──> Invalid
//! ```
//!
//! ## Validation order
//!
//! 1. Signature and algorithm ([`EnvelopeError::InvalidSignature`], [`EnvelopeError::Malformed`])
//! 2. Expiry: `now > exp` fails with [`EnvelopeError::Expired`]
//! 3. Presence of claims ([`EnvelopeError::Empty`] for revocation tokens)
//! 4. The caller's [`ClaimsPolicy`], whose error is carried unchanged in
//!    [`EnvelopeError::Rejected`]
//!
//! ## Important Notes
//!
//! * No server-side state exists. [`EnvelopeToken::revoke`] only produces a claims-less token
//!   for the holder to overwrite its copy with; a token captured elsewhere stays valid until
//!   its `exp`
//! * The token layer knows nothing about identities. Domain rules live in policies

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt::{Debug, Formatter};
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// The error type a [`ClaimsPolicy`] may fail with
pub type PolicyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Reasons a token could not be issued or was refused
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// The signing key could not be prepared
    #[error("Unable to prepare the signing key")]
    Key,
    /// The envelope could not be signed
    #[error("Unable to sign token")]
    Signing,
    /// The signature does not match the payload under this key, or the algorithm differs
    #[error("Token signature is invalid")]
    InvalidSignature,
    /// The token could not be decoded into an envelope of the expected claims type
    #[error("Token is malformed")]
    Malformed,
    /// The expiry instant has passed
    #[error("Token has expired")]
    Expired,
    /// The envelope carries no claims (a revocation token)
    #[error("Token carries no claims")]
    Empty,
    /// The claims policy refused the claims
    #[error("Token rejected: {0}")]
    Rejected(#[source] PolicyError),
}

impl From<jwt::Error> for EnvelopeError {
    fn from(err: jwt::Error) -> Self {
        match err {
            jwt::Error::InvalidSignature
            | jwt::Error::RustCryptoMac(_)
            | jwt::Error::AlgorithmMismatch(..) => Self::InvalidSignature,
            _ => Self::Malformed,
        }
    }
}

/// The signed payload
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Envelope<C> {
    /// Application claims. `None` for revocation tokens
    pub data: Option<C>,
    /// Absolute expiry, in seconds since the unix epoch
    pub exp: i64,
}

#[derive(Serialize)]
struct OutboundEnvelope<'a, C: Serialize> {
    data: Option<&'a C>,
    exp: i64,
}

/// Additional validation run on decoded claims once signature and expiry have passed.
///
/// The policy may consult external state (for example, the entity store) and may transform
/// the claims into whatever the caller needs next via [`ClaimsPolicy::Output`].
#[async_trait]
pub trait ClaimsPolicy<C: Send + 'static>: Send + Sync {
    /// What a successful check yields
    type Output: Send;
    /// Accepts or rejects the claims
    async fn check(&self, claims: C) -> Result<Self::Output, PolicyError>;
}

/// Accepts every well-signed, unexpired token and yields its claims
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptClaims;

#[async_trait]
impl<C: Send + 'static> ClaimsPolicy<C> for AcceptClaims {
    type Output = C;

    async fn check(&self, claims: C) -> Result<C, PolicyError> {
        Ok(claims)
    }
}

/// Adapts a synchronous predicate into a [`ClaimsPolicy`] that yields the claims on success
pub struct FnPolicy<F>(pub F);

#[async_trait]
impl<C, F> ClaimsPolicy<C> for FnPolicy<F>
where
    C: Send + 'static,
    F: Fn(&C) -> Result<(), PolicyError> + Send + Sync,
{
    type Output = C;

    async fn check(&self, claims: C) -> Result<C, PolicyError> {
        (self.0)(&claims)?;
        Ok(claims)
    }
}

/// Issues and validates envelope tokens under one signing secret
#[derive(Clone)]
pub struct EnvelopeToken {
    key: HmacSha256,
}

impl EnvelopeToken {
    pub fn new<T: AsRef<[u8]>>(secret: T) -> Result<Self, EnvelopeError> {
        let key = <HmacSha256 as Mac>::new_from_slice(secret.as_ref())
            .map_err(|_| EnvelopeError::Key)?;
        Ok(Self { key })
    }

    /// Signs `claims` with an expiry of now + `ttl`
    pub fn issue<C: Serialize>(&self, ttl: Duration, claims: &C) -> Result<String, EnvelopeError> {
        self.issue_at(ttl, claims, Utc::now())
    }

    /// Like [`Self::issue`], with an explicit issue instant
    pub fn issue_at<C: Serialize>(
        &self,
        ttl: Duration,
        claims: &C,
        now: DateTime<Utc>,
    ) -> Result<String, EnvelopeError> {
        self.sign(ttl, Some(claims), now)
    }

    /// Produces a claims-less token, meant to overwrite a session token held by a client
    pub fn revoke(&self, ttl: Duration) -> Result<String, EnvelopeError> {
        self.sign::<()>(ttl, None, Utc::now())
    }

    /// Validates `token` and runs `policy` on its claims
    pub async fn validate<C, P>(&self, token: &str, policy: &P) -> Result<P::Output, EnvelopeError>
    where
        C: DeserializeOwned + Send + 'static,
        P: ClaimsPolicy<C> + ?Sized,
    {
        self.validate_at(token, policy, Utc::now()).await
    }

    /// Like [`Self::validate`], judging expiry against `now`
    pub async fn validate_at<C, P>(
        &self,
        token: &str,
        policy: &P,
        now: DateTime<Utc>,
    ) -> Result<P::Output, EnvelopeError>
    where
        C: DeserializeOwned + Send + 'static,
        P: ClaimsPolicy<C> + ?Sized,
    {
        let claims = self.open_at::<C>(token, now)?;
        policy.check(claims).await.map_err(|err| {
            log::trace!(target: "wraith", "Claims policy rejected token: {}", err);
            EnvelopeError::Rejected(err)
        })
    }

    /// Checks signature, expiry and presence of claims only
    pub fn open_at<C: DeserializeOwned>(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<C, EnvelopeError> {
        let envelope: Envelope<C> = token.verify_with_key(&self.key)?;

        if now.timestamp() > envelope.exp {
            return Err(EnvelopeError::Expired);
        }

        envelope.data.ok_or(EnvelopeError::Empty)
    }

    fn sign<C: Serialize>(
        &self,
        ttl: Duration,
        claims: Option<&C>,
        now: DateTime<Utc>,
    ) -> Result<String, EnvelopeError> {
        let ttl = chrono::Duration::from_std(ttl).map_err(|_| EnvelopeError::Signing)?;
        let exp = now
            .checked_add_signed(ttl)
            .ok_or(EnvelopeError::Signing)?
            .timestamp();

        OutboundEnvelope { data: claims, exp }
            .sign_with_key(&self.key)
            .map_err(|_| EnvelopeError::Signing)
    }
}

impl Debug for EnvelopeToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("EnvelopeToken { .. }")
    }
}
