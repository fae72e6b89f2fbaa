//! # Keyed Cipher
//!
//! Authenticated encryption of UTF-8 strings under a human-chosen secret.
//!
//! ## Construction
//!
//! * The secret is run through SHA3-256 twice with distinct domain labels, producing an
//!   AES-256-GCM key and a nonce-derivation key
//! * The nonce is synthetic: the first 12 bytes of HMAC-SHA256(nonce key, plaintext).
//!   Encrypting the same plaintext under the same secret therefore always yields the same
//!   ciphertext, which lets an entity store match encrypted fields exactly
//! * Output is `base64(nonce || ciphertext || tag)`
//! * On decryption the nonce is recomputed from the recovered plaintext and compared in
//!   constant time, binding the nonce to the message
//!
//! ## Important Notes
//!
//! * Equal plaintexts produce equal ciphertexts. This is what makes encrypted lookups
//!   possible, and it reveals equality of values to anyone reading the store
//! * Any modification of the ciphertext, or use of a different secret, fails with
//!   [`CryptError::Decrypt`] rather than producing a different plaintext
//! * The empty string round-trips
//!
//! ```rust
//! use wraith_crypt::cipher::KeyedCipher;
//!
//! let cipher = KeyedCipher::new("correct horse battery staple").unwrap();
//! let ciphertext = cipher.encrypt("alice@example.com").unwrap();
//! assert_eq!(cipher.decrypt(&ciphertext).unwrap(), "alice@example.com");
//! ```

use crate::misc::CryptError;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha256;
use sha3::{Digest, Sha3_256};
use std::fmt::{Debug, Formatter};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Length of the AES-GCM nonce prepended to every ciphertext
pub const NONCE_LENGTH: usize = 12;
/// Length of the AES-GCM authentication tag
pub const TAG_LENGTH: usize = 16;

const ENCRYPTION_KEY_DOMAIN: &[u8] = b"wraith.cipher.encryption-key";
const NONCE_KEY_DOMAIN: &[u8] = b"wraith.cipher.nonce-key";

/// Encrypts and decrypts strings under one secret. Cheap to clone
#[derive(Clone)]
pub struct KeyedCipher {
    aead: Aes256Gcm,
    nonce_mac: HmacSha256,
}

impl KeyedCipher {
    /// Derives the cipher keys from `secret`. Any length is accepted, including passphrases
    pub fn new<T: AsRef<[u8]>>(secret: T) -> Result<Self, CryptError> {
        let encryption_key = derive_key(ENCRYPTION_KEY_DOMAIN, secret.as_ref());
        let nonce_key = derive_key(NONCE_KEY_DOMAIN, secret.as_ref());

        let aead = Aes256Gcm::new_from_slice(encryption_key.as_slice())
            .map_err(|_| CryptError::KeyDerivation)?;
        let nonce_mac = <HmacSha256 as Mac>::new_from_slice(nonce_key.as_slice())
            .map_err(|_| CryptError::KeyDerivation)?;

        Ok(Self { aead, nonce_mac })
    }

    /// Encrypts `plaintext`, returning the base64 ciphertext
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptError> {
        let nonce = self.synthetic_nonce(plaintext.as_bytes());
        let ciphertext = self
            .aead
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| CryptError::Encrypt)?;

        let mut packed = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        packed.extend_from_slice(&nonce);
        packed.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(packed))
    }

    /// Decrypts a value previously produced by [`Self::encrypt`] under the same secret
    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CryptError> {
        let packed = STANDARD
            .decode(ciphertext)
            .map_err(|_| CryptError::Encoding)?;

        if packed.len() < NONCE_LENGTH + TAG_LENGTH {
            return Err(CryptError::Encoding);
        }

        let (nonce, body) = packed.split_at(NONCE_LENGTH);
        let plaintext = Zeroizing::new(
            self.aead
                .decrypt(Nonce::from_slice(nonce), body)
                .map_err(|_| CryptError::Decrypt)?,
        );

        let expected = self.synthetic_nonce(&plaintext);
        if !bool::from(expected[..].ct_eq(nonce)) {
            return Err(CryptError::Decrypt);
        }

        String::from_utf8(plaintext.to_vec()).map_err(|_| CryptError::Decrypt)
    }

    /// Serializes `value` to JSON and encrypts the result as a single string
    pub fn seal<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, CryptError> {
        let json = Zeroizing::new(
            serde_json::to_string(value).map_err(|_| CryptError::Serialization)?,
        );
        self.encrypt(&json)
    }

    /// Inverse of [`Self::seal`]
    pub fn unseal<T: DeserializeOwned>(&self, sealed: &str) -> Result<T, CryptError> {
        let json = Zeroizing::new(self.decrypt(sealed)?);
        serde_json::from_str(&json).map_err(|_| CryptError::Serialization)
    }

    fn synthetic_nonce(&self, plaintext: &[u8]) -> [u8; NONCE_LENGTH] {
        let mut mac = self.nonce_mac.clone();
        mac.update(plaintext);
        let tag = mac.finalize().into_bytes();

        let mut nonce = [0u8; NONCE_LENGTH];
        nonce.copy_from_slice(&tag[..NONCE_LENGTH]);
        nonce
    }
}

impl Debug for KeyedCipher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyedCipher { .. }")
    }
}

fn derive_key(domain: &[u8], secret: &[u8]) -> Zeroizing<[u8; 32]> {
    let digest = Sha3_256::new()
        .chain_update(domain)
        .chain_update(secret)
        .finalize();
    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&digest);
    key
}
