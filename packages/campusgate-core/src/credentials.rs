//! Campus login identities and masking helpers.
//!
//! Credentials come from the surrounding application (config file or
//! environment); the core only ever reads them. Log output must never
//! carry a raw password, and ids are partially masked.

use serde::{Deserialize, Serialize};

/// One login identity for the portal. The operator supplies an ordered
/// list of these; the failover logic walks it front to back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
    pub password: String,
    #[serde(default)]
    pub is_encrypted: bool,
}

impl Credential {
    pub fn new(user_id: impl Into<String>, password: impl Into<String>, is_encrypted: bool) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: String::new(),
            password: password.into(),
            is_encrypted,
        }
    }

    /// Portal ids are exactly 12 numeric digits; anything else is rejected
    /// before a network attempt is wasted on it.
    pub fn is_valid(&self) -> bool {
        let id = self.user_id.trim();
        !self.password.trim().is_empty()
            && id.len() == 12
            && id.chars().all(|c| c.is_ascii_digit())
    }

    /// Id safe for logging: first 4 and last 3 digits kept.
    pub fn masked_id(&self) -> String {
        mask_user_id(self.user_id.trim())
    }

    /// Password safe for logging: fully starred out.
    pub fn masked_password(&self) -> String {
        "*".repeat(self.password.len())
    }
}

/// Mask a 12-digit portal id down to its first 4 and last 3 digits.
/// Ids of any other shape are starred out entirely.
pub fn mask_user_id(id: &str) -> String {
    if id.len() == 12 && id.is_ascii() {
        format!("{}*****{}", &id[..4], &id[9..])
    } else {
        "*".repeat(id.chars().count())
    }
}

/// Filter a credential list down to the entries worth attempting.
pub fn valid_credentials(users: &[Credential]) -> Vec<Credential> {
    users.iter().filter(|u| u.is_valid()).cloned().collect()
}
