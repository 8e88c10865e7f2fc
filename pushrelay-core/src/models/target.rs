//! Delivery target data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Characters of a token kept when logging.
const REDACTED_PREFIX_LEN: usize = 8;

/// A provider-issued pointer to an endpoint pushes can be sent to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryTarget {
    /// Opaque provider token
    pub id: String,
    /// When the token was obtained
    pub registered_at: DateTime<Utc>,
    /// Set on unsubscribe or provider-signaled invalidation
    pub revoked: bool,
}

impl DeliveryTarget {
    pub fn new(id: String) -> Self {
        Self {
            id,
            registered_at: Utc::now(),
            revoked: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.revoked && !self.id.trim().is_empty()
    }

    pub fn redacted_id(&self) -> String {
        redact_token(&self.id)
    }
}

/// Shorten a token for log output. Never log tokens in full.
pub fn redact_token(token: &str) -> String {
    if token.chars().count() <= REDACTED_PREFIX_LEN {
        return "***".to_string();
    }
    let prefix: String = token.chars().take(REDACTED_PREFIX_LEN).collect();
    format!("{}...", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_target_is_valid() {
        let target = DeliveryTarget::new("token-123".to_string());
        assert!(target.is_valid());
        assert!(!target.revoked);
    }

    #[test]
    fn test_revoked_or_blank_target_is_invalid() {
        let mut target = DeliveryTarget::new("token-123".to_string());
        target.revoked = true;
        assert!(!target.is_valid());
        assert!(!DeliveryTarget::new("  ".to_string()).is_valid());
    }

    #[test]
    fn test_redact_token() {
        assert_eq!(redact_token("abcdefghijklmnop"), "abcdefgh...");
        assert_eq!(redact_token("short"), "***");
    }
}
