use crate::identity::Identity;
use crate::misc::AccountError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use wraith_crypt::envelope::{EnvelopeToken, FnPolicy, PolicyError};

/// The sanitized identity embedded in a session token. Never carries the digest
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub id: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub display_name: String,
}

impl From<&Identity> for SessionClaims {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.clone(),
            username: identity.username.clone(),
            email: identity.email.clone(),
            phone: identity.phone.clone(),
            display_name: identity.display_name.clone(),
        }
    }
}

/// Issues, checks and closes session tokens
#[derive(Clone)]
pub struct SessionManager {
    tokens: EnvelopeToken,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(tokens: EnvelopeToken, ttl: Duration) -> Self {
        Self { tokens, ttl }
    }

    /// Mints a session token for a logged-in identity
    pub fn open(&self, identity: &Identity) -> Result<String, AccountError> {
        if identity.id.is_empty() {
            return Err(AccountError::invalid_request("an id is required"));
        }

        Ok(self.tokens.issue(self.ttl, &SessionClaims::from(identity))?)
    }

    /// Returns the claims of a valid session token
    pub async fn authenticate(&self, token: &str) -> Result<SessionClaims, AccountError> {
        let policy = FnPolicy(|claims: &SessionClaims| -> Result<(), PolicyError> {
            if claims.id.is_empty() {
                return Err(Box::new(AccountError::TokenRejected(
                    "session carries no identity".to_string(),
                )));
            }
            Ok(())
        });

        Ok(self
            .tokens
            .validate::<SessionClaims, _>(token, &policy)
            .await?)
    }

    /// The token a client overwrites its session with on logout. A captured copy of the
    /// previous token stays valid until it expires
    pub fn close(&self) -> Result<String, AccountError> {
        Ok(self.tokens.revoke(self.ttl)?)
    }
}

#[cfg(test)]
mod tests {
    use super::SessionManager;
    use crate::identity::Identity;
    use crate::misc::AccountError;
    use std::time::Duration;
    use wraith_crypt::envelope::EnvelopeToken;

    fn sessions() -> SessionManager {
        SessionManager::new(
            EnvelopeToken::new("jwt-secret").unwrap(),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn open_then_authenticate() {
        let identity = Identity {
            id: "1".to_string(),
            username: "alice".to_string(),
            password_digest: "digest".to_string(),
            ..Default::default()
        };

        let sessions = sessions();
        let token = sessions.open(&identity).unwrap();
        let claims = sessions.authenticate(&token).await.unwrap();
        assert_eq!(claims.id, "1");
        assert_eq!(claims.username, "alice");
    }

    #[tokio::test]
    async fn closed_session_is_rejected() {
        let sessions = sessions();
        let token = sessions.close().unwrap();
        assert!(matches!(
            sessions.authenticate(&token).await,
            Err(AccountError::TokenRejected(..))
        ));
    }

    #[tokio::test]
    async fn foreign_token_is_rejected() {
        let other = SessionManager::new(
            EnvelopeToken::new("other-secret").unwrap(),
            Duration::from_secs(60),
        );
        let token = other
            .open(&Identity {
                id: "1".to_string(),
                ..Default::default()
            })
            .unwrap();

        assert!(matches!(
            sessions().authenticate(&token).await,
            Err(AccountError::InvalidSignature)
        ));
    }
}
