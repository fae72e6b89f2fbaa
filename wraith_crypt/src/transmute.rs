//! # Entity Transmutation
//!
//! Reversible, field-level encryption of whole records, used for encryption at rest.
//!
//! A record opts in by implementing [`Encryptable`], listing every sensitive string field it
//! owns. The [`Transmuter`] walks that list without knowing anything about the record's shape,
//! so the same walker serves every entity type.
//!
//! ## Important Notes
//!
//! * Empty fields mean "absent" and are left untouched in both directions
//! * Transmutation works on a copy. If any field fails, the error names that field and the
//!   caller's record is unchanged
//! * Because [`KeyedCipher`] is deterministic, a transmuted sparse query still matches the
//!   transmuted record it was derived from
//!
//! ```rust
//! use wraith_crypt::prelude::*;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Contact {
//!     name: String,
//!     email: String,
//! }
//!
//! impl Encryptable for Contact {
//!     fn sensitive_fields(&mut self) -> Vec<(&'static str, &mut String)> {
//!         vec![("name", &mut self.name), ("email", &mut self.email)]
//!     }
//! }
//!
//! let transmuter = Transmuter::new(KeyedCipher::new("secret").unwrap());
//! let contact = Contact { name: "Alice".into(), email: String::new() };
//! let sealed = transmuter.transmute(&contact).unwrap();
//! assert_eq!(transmuter.revert(&sealed).unwrap(), contact);
//! ```

use crate::cipher::KeyedCipher;
use crate::misc::CryptError;
use std::fmt::{Display, Formatter};

/// Implemented by records whose string fields must be encrypted at rest
pub trait Encryptable: Clone {
    /// Every sensitive field, paired with a stable name used in error reports
    fn sensitive_fields(&mut self) -> Vec<(&'static str, &mut String)>;
}

/// The direction a transmutation was running in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Plaintext to ciphertext
    Transmute,
    /// Ciphertext to plaintext
    Revert,
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transmute => f.write_str("encrypt"),
            Self::Revert => f.write_str("decrypt"),
        }
    }
}

/// A single field failed, aborting the whole record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unable to {direction} field `{field}`")]
pub struct TransmutationError {
    /// The name reported by [`Encryptable::sensitive_fields`]
    pub field: &'static str,
    /// Which way the record was being converted
    pub direction: Direction,
    /// The underlying cipher failure
    #[source]
    pub source: CryptError,
}

/// Encrypts or decrypts every sensitive field of an [`Encryptable`] record
#[derive(Clone, Debug)]
pub struct Transmuter {
    cipher: KeyedCipher,
}

impl Transmuter {
    pub fn new(cipher: KeyedCipher) -> Self {
        Self { cipher }
    }

    /// Returns a copy of `record` with every populated sensitive field encrypted
    pub fn transmute<T: Encryptable>(&self, record: &T) -> Result<T, TransmutationError> {
        self.apply(record, Direction::Transmute)
    }

    /// Returns a copy of `record` with every populated sensitive field decrypted
    pub fn revert<T: Encryptable>(&self, record: &T) -> Result<T, TransmutationError> {
        self.apply(record, Direction::Revert)
    }

    fn apply<T: Encryptable>(
        &self,
        record: &T,
        direction: Direction,
    ) -> Result<T, TransmutationError> {
        let mut output = record.clone();

        for (field, value) in output.sensitive_fields() {
            if value.is_empty() {
                continue;
            }

            let converted = match direction {
                Direction::Transmute => self.cipher.encrypt(value),
                Direction::Revert => self.cipher.decrypt(value),
            }
            .map_err(|source| TransmutationError {
                field,
                direction,
                source,
            })?;

            *value = converted;
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct TestEntity {
        field1: String,
        field2: String,
        counter: u32,
    }

    impl Encryptable for TestEntity {
        fn sensitive_fields(&mut self) -> Vec<(&'static str, &mut String)> {
            vec![("field1", &mut self.field1), ("field2", &mut self.field2)]
        }
    }

    fn transmuter() -> Transmuter {
        Transmuter::new(KeyedCipher::new("supersecretkey").unwrap())
    }

    #[rstest]
    #[case("value1", "value2")]
    #[case("", "value2")]
    #[case("value1", "")]
    #[case("", "")]
    fn round_trip(#[case] field1: &str, #[case] field2: &str) {
        let entity = TestEntity {
            field1: field1.to_string(),
            field2: field2.to_string(),
            counter: 7,
        };

        let transmuter = transmuter();
        let encrypted = transmuter.transmute(&entity).unwrap();
        assert_eq!(encrypted.counter, 7);
        assert_eq!(encrypted.field1.is_empty(), field1.is_empty());
        assert_eq!(encrypted.field2.is_empty(), field2.is_empty());
        if !field1.is_empty() {
            assert_ne!(encrypted.field1, field1);
        }

        assert_eq!(transmuter.revert(&encrypted).unwrap(), entity);
    }

    #[test]
    fn revert_of_known_ciphertexts() {
        let cipher = KeyedCipher::new("supersecretkey").unwrap();
        let entity = TestEntity {
            field1: cipher.encrypt("value1").unwrap(),
            field2: cipher.encrypt("value2").unwrap(),
            counter: 0,
        };

        let reverted = transmuter().revert(&entity).unwrap();
        assert_eq!(reverted.field1, "value1");
        assert_eq!(reverted.field2, "value2");
    }

    #[test]
    fn failure_names_field_and_leaves_input_untouched() {
        let cipher = KeyedCipher::new("supersecretkey").unwrap();
        let entity = TestEntity {
            field1: cipher.encrypt("value1").unwrap(),
            field2: "this was never encrypted".to_string(),
            counter: 0,
        };
        let before = entity.clone();

        let err = transmuter().revert(&entity).unwrap_err();
        assert_eq!(err.field, "field2");
        assert_eq!(err.direction, Direction::Revert);
        assert_eq!(entity, before);
        assert!(!err.to_string().contains("never encrypted"));
    }
}
