//! # Errors
//!
//! The single error type every account-facing operation returns.
//!
//! ## Important Notes
//!
//! * Messages never carry plaintext, digests, tokens or secrets
//! * "Not found" and "incorrect password" share generic wording so responses do not reveal
//!   which part of a credential was wrong
//! * A [`ClaimsPolicy`](wraith_crypt::envelope::ClaimsPolicy) that fails with an
//!   [`AccountError`] gets that same error back out of token validation, so callers can match
//!   on [`AccountError::NotFound`] or [`AccountError::SamePassword`] directly

use wraith_crypt::envelope::EnvelopeError;
use wraith_crypt::misc::CryptError;
use wraith_crypt::transmute::TransmutationError;

/// Default Error type for this crate
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// No matching record exists
    #[error("account not found")]
    NotFound,
    /// Another identity already holds the username, email or phone
    #[error("account already exists")]
    AlreadyExists,
    /// The supplied password does not hash to the stored digest
    #[error("incorrect credentials")]
    IncorrectPassword,
    /// A reset proposed the password already in use
    #[error("new password cannot be the same as the old password")]
    SamePassword,
    /// The token's expiry has passed
    #[error("token expired")]
    TokenExpired,
    /// The token's signature is invalid or it could not be decoded
    #[error("invalid token")]
    InvalidSignature,
    /// The token was well-formed and signed, but its claims were refused
    #[error("token rejected: {0}")]
    TokenRejected(String),
    /// A cipher, hash or signing primitive failed
    #[error(transparent)]
    Crypto(#[from] CryptError),
    /// A record could not be encrypted or decrypted
    #[error(transparent)]
    Transmutation(#[from] TransmutationError),
    /// The license is inactive or expired
    #[error("license is either inactive or expired")]
    LicenseInvalid,
    /// The proposed username or password does not meet the format requirements
    #[error("{0}")]
    InvalidCredentials(String),
    /// The request is missing something it needs
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The store did not answer within the configured deadline
    #[error("store did not respond in time")]
    StoreTimeout,
    /// Configuration is missing or inconsistent
    #[error("configuration error: {0}")]
    Config(String),
    /// The store reported a failure of its own
    #[error("backend error: {0}")]
    Backend(String),
}

impl AccountError {
    pub(crate) fn invalid_request<T: Into<String>>(msg: T) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub(crate) fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }

    /// Returns true for errors that should abort startup rather than fail a single request
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::LicenseInvalid | Self::Config(..))
    }
}

impl From<EnvelopeError> for AccountError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::Expired => Self::TokenExpired,
            EnvelopeError::InvalidSignature | EnvelopeError::Malformed => Self::InvalidSignature,
            EnvelopeError::Empty => Self::TokenRejected("token carries no claims".to_string()),
            EnvelopeError::Key => Self::Crypto(CryptError::KeyDerivation),
            EnvelopeError::Signing => Self::Crypto(CryptError::Signing),
            EnvelopeError::Rejected(source) => match source.downcast::<AccountError>() {
                Ok(err) => *err,
                Err(other) => Self::TokenRejected(other.to_string()),
            },
        }
    }
}
