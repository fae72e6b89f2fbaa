//! # Wraith Account Management (wraith_user)
//!
//! Identity rules and gate-keeping for the wraith account service, built on the primitives of
//! `wraith_crypt`.
//!
//! ## Features
//!
//! * **Identity rules**: registration, login, lookup, merge-patch edit and removal
//! * **Password reset**: reset tickets backed by short-lived envelope tokens
//! * **Sessions**: session tokens carrying the sanitized identity
//! * **Credential gate**: operator username/password check for internal routes
//! * **License activation**: startup check that the product license is active and unexpired
//! * **Encryption at rest**: optional transmutation of every stored identity
//!
//! ## Architecture
//!
//! ```text
//! WraithNode
//! ├── ApiKey
//! ├── AccountManager ── IdentityStore
//! │   ├── ResetManager
//! │   └── SessionManager
//! ├── Manticore ─────── OperatorStore
//! └── license::activate ─ LicenseStore (startup)
//! ```
//!
//! ## Important Notes
//!
//! * The stores are external collaborators. [`backend::memory::MemoryBackend`] implements
//!   all three for tests and embedded use
//! * All components are cheap to clone and read-only after bootstrap
//! * Session revocation is a client-side overwrite. There is no server-side deny-list
//!
//! ## Related Components
//!
//! * `wraith_crypt`: cipher, hash, transmutation and envelope tokens
//! * `wraith_logging`: subscriber setup for binaries and tests
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
    pub use crate::account_manager::AccountManager;
    pub use crate::backend::memory::MemoryBackend;
    pub use crate::backend::{
        IdentityStore, LicenseStore, OperatorStore, PersistenceHandler, Stores,
    };
    pub use crate::config::{Options, Secrets, WraithConfig};
    pub use crate::credentials::CredentialRequirements;
    pub use crate::guard::{Manticore, OperatorCredential};
    pub use crate::identity::Identity;
    pub use crate::license::License;
    pub use crate::misc::AccountError;
    pub use crate::node::WraithNode;
    pub use crate::reset::{ResetClaims, ResetManager, ResetTicket};
    pub use crate::session::{SessionClaims, SessionManager};
}

/// The identity rules
pub mod account_manager;
/// Store traits and the in-memory backend
pub mod backend;
/// Node configuration and secrets
pub mod config;
/// Username and password format rules
pub mod credentials;
/// Operator credential gate
pub mod guard;
/// The user account record
pub mod identity;
/// License activation
pub mod license;
/// Error type
pub mod misc;
/// Startup wiring
pub mod node;
/// Password reset
pub mod reset;
/// Session tokens
pub mod session;
