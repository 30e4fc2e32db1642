use chrono::{DateTime, Utc};
use vgate_core::Expiry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryStatus {
    NotExpired,
    Expired,
    /// Unparseable timestamp. Callers treat it as not expired.
    InvalidFormat,
}

impl ExpiryStatus {
    pub fn is_expired(self) -> bool {
        matches!(self, ExpiryStatus::Expired)
    }
}

/// Status of an already parsed expiry at `now`. A version expiring exactly at
/// `now` is still usable.
pub fn check_at(expiry: &Expiry, now: DateTime<Utc>) -> ExpiryStatus {
    match expiry {
        Expiry::Never => ExpiryStatus::NotExpired,
        Expiry::At(at) if *at < now => ExpiryStatus::Expired,
        Expiry::At(_) => ExpiryStatus::NotExpired,
        Expiry::Invalid(_) => ExpiryStatus::InvalidFormat,
    }
}

/// Parse and check a raw `YYYY-MM-DD HH:MM` value.
pub fn expiry_status(raw: Option<&str>, now: DateTime<Utc>) -> ExpiryStatus {
    check_at(&Expiry::parse(raw), now)
}
