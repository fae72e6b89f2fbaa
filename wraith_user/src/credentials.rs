use crate::misc::AccountError;
use serde::{Deserialize, Serialize};

/// Format rules a proposed username and password must satisfy at registration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct CredentialRequirements {
    pub min_password_length: u8,
    pub max_password_length: u8,
    pub min_username_length: u8,
    pub max_username_length: u8,
}

impl Default for CredentialRequirements {
    fn default() -> Self {
        Self {
            min_password_length: MIN_PASSWORD_LENGTH,
            max_password_length: MAX_PASSWORD_LENGTH,
            min_username_length: MIN_USERNAME_LENGTH,
            max_username_length: MAX_USERNAME_LENGTH,
        }
    }
}

impl CredentialRequirements {
    /// Used to determine if the desired credentials have a valid format and length. This alone
    /// DOES NOT imply whether or not the credentials are available
    pub fn check<T: AsRef<str>, R: AsRef<str>>(
        &self,
        username: T,
        password: R,
    ) -> Result<(), AccountError> {
        let username = username.as_ref();
        let password = password.as_ref();
        let username_len = username.chars().count();
        let password_len = password.chars().count();

        if username_len < self.min_username_length as usize
            || username_len > self.max_username_length as usize
        {
            return Err(AccountError::InvalidCredentials(format!(
                "Username must be between {} and {} characters",
                self.min_username_length, self.max_username_length
            )));
        }

        if username.chars().any(char::is_whitespace) {
            return Err(AccountError::InvalidCredentials(
                "Username cannot contain spaces. Use a period instead".to_string(),
            ));
        }

        if password_len < self.min_password_length as usize
            || password_len > self.max_password_length as usize
        {
            return Err(AccountError::InvalidCredentials(format!(
                "Password must be between {} and {} characters",
                self.min_password_length, self.max_password_length
            )));
        }

        if password.chars().any(char::is_whitespace) {
            return Err(AccountError::InvalidCredentials(
                "Password cannot contain spaces".to_string(),
            ));
        }

        Ok(())
    }
}

///
pub const MIN_PASSWORD_LENGTH: u8 = 6;
///
pub const MAX_PASSWORD_LENGTH: u8 = 128;

///
pub const MIN_USERNAME_LENGTH: u8 = 3;
///
pub const MAX_USERNAME_LENGTH: u8 = 64;
