//! Per-account session state.

use std::time::{Duration, Instant};

use super::models::User;
use super::proxy::ProxySpec;

/// How long an issued auth payload is trusted by the backend.
pub const TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Bearer token and the moment it stops being trusted.
#[derive(Debug, Clone, Default)]
pub struct TokenState {
    payload: Option<String>,
    expires_at: Option<Instant>,
}

impl TokenState {
    /// Stores a freshly issued payload valid for [`TOKEN_LIFETIME`] from `now`.
    pub fn issue(&mut self, payload: String, now: Instant) {
        self.payload = Some(payload);
        self.expires_at = Some(now + TOKEN_LIFETIME);
    }

    /// Forgets the payload, forcing a new handshake.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// True when no payload was ever issued or the deadline has passed.
    #[must_use]
    pub fn needs_refresh(&self, now: Instant) -> bool {
        match (&self.payload, self.expires_at) {
            (Some(_), Some(deadline)) => now >= deadline,
            _ => true,
        }
    }

    /// Whether a payload was issued at some point.
    #[must_use]
    pub fn was_issued(&self) -> bool {
        self.expires_at.is_some()
    }

    #[must_use]
    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }
}

/// One automated account.
#[derive(Debug, Clone)]
pub struct Session {
    /// Display name used in log lines.
    pub name: String,

    pub proxy: Option<ProxySpec>,

    pub token: TokenState,

    /// Telegram id learned during the last handshake.
    pub telegram_user_id: Option<i64>,

    /// Last user record fetched from the backend.
    pub user: Option<User>,
}

impl Session {
    #[must_use]
    pub fn new(name: String, proxy: Option<ProxySpec>) -> Self {
        Self {
            name,
            proxy,
            token: TokenState::default(),
            telegram_user_id: None,
            user: None,
        }
    }
}
