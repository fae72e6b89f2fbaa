use crate::misc::CryptError;
use hmac::{Hmac, Mac};
use sha2::Sha512;
use std::fmt::{Debug, Formatter};
use subtle::ConstantTimeEq;

type HmacSha512 = Hmac<Sha512>;

/// Deterministic keyed one-way hash: `hex(HMAC-SHA512(secret, input))`.
///
/// Used for password digests and for comparing a candidate password against a stored digest.
/// There is no inverse.
#[derive(Clone)]
pub struct SaltedHash {
    mac: HmacSha512,
}

impl SaltedHash {
    /// Keys the hash with `secret`
    pub fn new<T: AsRef<[u8]>>(secret: T) -> Result<Self, CryptError> {
        let mac = <HmacSha512 as Mac>::new_from_slice(secret.as_ref())
            .map_err(|_| CryptError::KeyDerivation)?;
        Ok(Self { mac })
    }

    /// Returns the lowercase hex digest of `input`
    pub fn digest<T: AsRef<[u8]>>(&self, input: T) -> String {
        let mut mac = self.mac.clone();
        mac.update(input.as_ref());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Returns true if `input` hashes to `digest`. Runs in constant time with respect to the
    /// contents of `digest`
    pub fn verify<T: AsRef<[u8]>>(&self, input: T, digest: &str) -> bool {
        self.digest(input).as_bytes().ct_eq(digest.as_bytes()).into()
    }
}

impl Debug for SaltedHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("SaltedHash { .. }")
    }
}

#[cfg(test)]
mod tests {
    use super::SaltedHash;
    use rstest::rstest;

    #[test]
    fn known_vector() {
        // RFC 4231 test case 2
        let hasher = SaltedHash::new("Jefe").unwrap();
        assert_eq!(
            hasher.digest("what do ya want for nothing?"),
            "164b7a7bfcf819e2e395fbe73b56e0a387bd64222e831fd610270cd7ea250554\
             9758bf75c05a994a6d034f65f8f0e6fdcaeab1a34d4a6b4b636e070a38bce737"
        );
    }

    #[rstest]
    #[case("password")]
    #[case("")]
    #[case("correct horse battery staple")]
    fn deterministic(#[case] input: &str) {
        let hasher = SaltedHash::new("secret").unwrap();
        assert_eq!(hasher.digest(input), hasher.digest(input));
        assert_eq!(hasher.digest(input).len(), 128);
    }

    #[test]
    fn secrets_separate_digests() {
        let first = SaltedHash::new("secret-one").unwrap();
        let second = SaltedHash::new("secret-two").unwrap();
        assert_ne!(first.digest("password"), second.digest("password"));
    }

    #[test]
    fn verify() {
        let hasher = SaltedHash::new("secret").unwrap();
        let digest = hasher.digest("rightpass");
        assert!(hasher.verify("rightpass", &digest));
        assert!(!hasher.verify("wrongpass", &digest));
        assert!(!hasher.verify("rightpass", ""));
        assert!(!hasher.verify("rightpass", &digest[..64]));
    }
}
