use sha2::{Digest, Sha256};
use std::fmt::{Debug, Formatter};
use subtle::ConstantTimeEq;

/// The API key every request must present, derived from a configured keyword as
/// `hex(SHA-256(keyword))`
#[derive(Clone)]
pub struct ApiKey {
    expected: String,
}

impl ApiKey {
    pub fn derive<T: AsRef<[u8]>>(keyword: T) -> Self {
        let expected = hex::encode(Sha256::digest(keyword.as_ref()));
        Self { expected }
    }

    /// The derived key, for handing out to clients
    pub fn as_str(&self) -> &str {
        &self.expected
    }

    /// Constant-time comparison against a presented key
    pub fn verify(&self, presented: &str) -> bool {
        self.expected.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

impl Debug for ApiKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey { .. }")
    }
}
