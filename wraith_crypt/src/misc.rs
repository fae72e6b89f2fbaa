/// Default Error type for this crate. Variants carry no payload derived from the input:
/// neither plaintext nor key material may appear in an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CryptError {
    /// The key could not be prepared from the supplied secret
    #[error("[CryptError] Unable to derive key material")]
    KeyDerivation,
    /// Encryption failed
    #[error("[CryptError] Encryption failed")]
    Encrypt,
    /// Authentication or decryption failed. Returned for tampered input and for input
    /// produced under a different secret
    #[error("[CryptError] Decryption failed")]
    Decrypt,
    /// The ciphertext is not valid base64 or is too short to hold a nonce and a tag
    #[error("[CryptError] Ciphertext is malformed")]
    Encoding,
    /// A sealed value could not be converted to or from JSON
    #[error("[CryptError] Sealed value could not be (de)serialized")]
    Serialization,
    /// A token could not be signed, or its expiry could not be represented
    #[error("[CryptError] Token could not be signed")]
    Signing,
}
