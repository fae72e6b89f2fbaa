//! # Identity
//!
//! The user account record, and the sparse-query convention the entity store matches it
//! with.
//!
//! An [`Identity`] doubles as a query: every empty string field means "do not filter on
//! this", so `Identity { email: "a@b.c".into(), ..Default::default() }` selects by email
//! alone. [`Identity::lookup_key`] builds the narrow form used for login, removal and reset,
//! where only `id`, `username`, `email` and `phone` may participate.
//!
//! ## Important Notes
//!
//! * `password_digest` holds the Salted Hash, never the password. Inbound it carries the
//!   candidate password until the rules layer hashes it
//! * [`Identity::sanitized`] removes the digest before a record leaves the service
//! * With encryption at rest, every populated string field listed in
//!   [`Encryptable::sensitive_fields`] is stored encrypted. Timestamps and `metadata` are
//!   stored as is

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wraith_crypt::transmute::Encryptable;

/// A user account
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub display_name: String,
    #[serde(rename = "password", skip_serializing_if = "String::is_empty")]
    pub password_digest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub status: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Identity {
    /// Only the fields that identify an account: id, username, email and phone
    pub fn lookup_key(&self) -> Self {
        Self {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            ..Default::default()
        }
    }

    /// Only the fields that must be unique across identities
    pub fn uniqueness_key(&self) -> Self {
        Self {
            username: self.username.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            ..Default::default()
        }
    }

    /// A copy safe to hand back to a client
    pub fn sanitized(&self) -> Self {
        Self {
            password_digest: String::new(),
            ..self.clone()
        }
    }

    /// True when no field is populated. Such a query would match every record
    pub fn is_empty_query(&self) -> bool {
        self.id.is_empty()
            && self.username.is_empty()
            && self.email.is_empty()
            && self.phone.is_empty()
            && self.display_name.is_empty()
            && self.password_digest.is_empty()
            && self.status.is_empty()
    }

    /// Sparse match: every populated string field of `query` equals the same field here
    pub fn matches(&self, query: &Identity) -> bool {
        fn field(query: &str, value: &str) -> bool {
            query.is_empty() || query == value
        }

        field(&query.id, &self.id)
            && field(&query.username, &self.username)
            && field(&query.email, &self.email)
            && field(&query.phone, &self.phone)
            && field(&query.display_name, &self.display_name)
            && field(&query.password_digest, &self.password_digest)
            && field(&query.status, &self.status)
    }

    /// True if any populated unique field of `candidate` equals the same field here
    pub fn collides_with(&self, candidate: &Identity) -> bool {
        fn field(candidate: &str, value: &str) -> bool {
            !candidate.is_empty() && candidate == value
        }

        field(&candidate.username, &self.username)
            || field(&candidate.email, &self.email)
            || field(&candidate.phone, &self.phone)
    }

    /// Overwrites every field populated in `patch`, leaving the rest as they are
    pub fn merge(&mut self, patch: &Identity) {
        fn field(target: &mut String, patch: &str) {
            if !patch.is_empty() {
                *target = patch.to_string();
            }
        }

        field(&mut self.username, &patch.username);
        field(&mut self.email, &patch.email);
        field(&mut self.phone, &patch.phone);
        field(&mut self.display_name, &patch.display_name);
        field(&mut self.password_digest, &patch.password_digest);
        field(&mut self.status, &patch.status);

        if patch.created_at.is_some() {
            self.created_at = patch.created_at;
        }

        if patch.updated_at.is_some() {
            self.updated_at = patch.updated_at;
        }

        for (key, value) in &patch.metadata {
            let _ = self.metadata.insert(key.clone(), value.clone());
        }
    }
}

impl Encryptable for Identity {
    fn sensitive_fields(&mut self) -> Vec<(&'static str, &mut String)> {
        vec![
            ("id", &mut self.id),
            ("username", &mut self.username),
            ("email", &mut self.email),
            ("phone", &mut self.phone),
            ("display_name", &mut self.display_name),
            ("password", &mut self.password_digest),
            ("status", &mut self.status),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::Identity;
    use rstest::rstest;

    fn alice() -> Identity {
        Identity {
            id: "1".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            phone: "+15550100".to_string(),
            display_name: "Alice".to_string(),
            password_digest: "digest".to_string(),
            ..Default::default()
        }
    }

    #[rstest]
    #[case(Identity { email: "alice@example.com".into(), ..Default::default() }, true)]
    #[case(Identity { email: "alice@example.com".into(), phone: "+15550100".into(), ..Default::default() }, true)]
    #[case(Identity { email: "alice@example.com".into(), phone: "+0".into(), ..Default::default() }, false)]
    #[case(Identity { username: "bob".into(), ..Default::default() }, false)]
    #[case(Identity::default(), true)]
    fn sparse_matching(#[case] query: Identity, #[case] expected: bool) {
        assert_eq!(alice().matches(&query), expected);
    }

    #[rstest]
    #[case(Identity { username: "alice".into(), ..Default::default() }, true)]
    #[case(Identity { username: "bob".into(), phone: "+15550100".into(), ..Default::default() }, true)]
    #[case(Identity { username: "bob".into(), email: "bob@example.com".into(), ..Default::default() }, false)]
    #[case(Identity { id: "1".into(), ..Default::default() }, false)]
    fn collisions(#[case] candidate: Identity, #[case] expected: bool) {
        assert_eq!(alice().collides_with(&candidate), expected);
    }

    #[test]
    fn merge_only_overwrites_populated_fields() {
        let mut record = alice();
        record.merge(&Identity {
            id: "1".to_string(),
            display_name: "Alice L.".to_string(),
            ..Default::default()
        });

        assert_eq!(record.display_name, "Alice L.");
        assert_eq!(record.email, "alice@example.com");
        assert_eq!(record.password_digest, "digest");
    }

    #[test]
    fn lookup_key_never_carries_password() {
        let key = alice().lookup_key();
        assert!(key.password_digest.is_empty());
        assert!(key.display_name.is_empty());
        assert_eq!(key.username, "alice");
    }

    #[test]
    fn sanitized_drops_digest_from_json() {
        let json = serde_json::to_value(alice().sanitized()).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["username"], "alice");
    }

    #[test]
    fn inbound_password_maps_to_digest_field() {
        let parsed: Identity =
            serde_json::from_str(r#"{"username":"alice","password":"hunter22"}"#).unwrap();
        assert_eq!(parsed.password_digest, "hunter22");
        assert!(parsed.email.is_empty());
    }
}
