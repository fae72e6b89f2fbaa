use crate::backend::LicenseStore;
use crate::misc::AccountError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A product license as held by the license store
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct License {
    pub key: String,
    pub product_name: String,
    pub customer_name: String,
    pub customer_email: String,
    pub issued_at: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub max_activations: u32,
    pub current_activations: u32,
    pub is_active: bool,
}

impl License {
    /// Active and not yet expired at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expiry_date > now
    }
}

/// Confirms the license `key` is usable. Run once at startup; any error is fatal
pub async fn activate<S: LicenseStore + ?Sized>(store: &S, key: &str) -> Result<License, AccountError> {
    activate_at(store, key, Utc::now()).await
}

/// Like [`activate`], judging expiry against `now`
pub async fn activate_at<S: LicenseStore + ?Sized>(
    store: &S,
    key: &str,
    now: DateTime<Utc>,
) -> Result<License, AccountError> {
    let license = store
        .get_license(key)
        .await?
        .ok_or(AccountError::NotFound)?;

    if !license.is_valid_at(now) {
        log::error!(target: "wraith", "License for {} is either inactive or expired", license.product_name);
        return Err(AccountError::LicenseInvalid);
    }

    log::info!(target: "wraith", "License for {} valid until {}", license.product_name, license.expiry_date);
    Ok(license)
}
