//! # Wraith Cryptographic Core (wraith_crypt)
//!
//! The primitives the account service builds its credential handling on. Every type in this
//! crate is keyed once at startup and is read-only afterwards, so handles can be cloned into
//! request tasks freely.
//!
//! ## Features
//!
//! * **Keyed Cipher**: AES-256-GCM encryption of strings under a passphrase-derived key
//! * **Salted Hash**: HMAC-SHA512 digests used for password storage and comparison
//! * **Transmutation**: reversible encryption of every sensitive string field of a record
//! * **Envelope Token**: compact HS256-signed tokens carrying claims and an expiry instant,
//!   validated through a pluggable [`envelope::ClaimsPolicy`]
//! * **API key**: derivation and constant-time verification of the service API key
//!
//! ## Important Notes
//!
//! * Error messages never contain plaintext, digests or key material
//! * The cipher is deterministic for a given key, so encrypted fields can still be used as
//!   exact-match query filters by the entity store
//! * Digest and API key comparisons are constant-time
//!
//! ## Related Components
//!
//! * `wraith_user`: identity rules, credential gate and license activation built on top
//!   of this crate
//!
#![forbid(unsafe_code)]
#![deny(
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    variant_size_differences,
    unused_features,
    unused_results
)]

/// Convenient imports for external use
pub mod prelude {
    pub use crate::apikey::ApiKey;
    pub use crate::cipher::KeyedCipher;
    pub use crate::envelope::{
        AcceptClaims, ClaimsPolicy, EnvelopeError, EnvelopeToken, FnPolicy, PolicyError,
    };
    pub use crate::hash::SaltedHash;
    pub use crate::misc::CryptError;
    pub use crate::transmute::{Encryptable, TransmutationError, Transmuter};
}

/// Derivation and verification of the service API key
pub mod apikey;
/// Symmetric, authenticated string encryption
pub mod cipher;
/// Signed, time-bound claims tokens
pub mod envelope;
/// Keyed one-way hashing
pub mod hash;
/// Error type
pub mod misc;
/// Field-level encryption of whole records
pub mod transmute;
