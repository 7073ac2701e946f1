//! Bearer tokens issued by credential sources.

use chrono::{DateTime, Utc};
use std::fmt;

/// OAuth access token for the log query API.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    secret: String,
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            secret: secret.into(),
            expires_on,
        }
    }

    /// Raw token value for the `Authorization` header.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_on <= now
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_debug_hides_secret() {
        let token = AccessToken::new("eyJ0eXAi.secret", Utc::now());
        let debug = format!("{token:?}");
        assert!(!debug.contains("eyJ0eXAi"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        assert!(AccessToken::new("t", now - Duration::seconds(1)).is_expired(now));
        assert!(!AccessToken::new("t", now + Duration::hours(1)).is_expired(now));
    }
}
