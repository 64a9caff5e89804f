//! Record and outcome types shared by the store and the service.

use secrecy::{ExposeSecret, SecretString};
use std::time::{Duration, Instant};
use subtle::ConstantTimeEq;

/// A generated passcode. `Debug` never prints the digits.
#[derive(Clone)]
pub struct OtpCode(SecretString);

impl OtpCode {
    #[must_use]
    pub fn new(digits: String) -> Self {
        Self(SecretString::from(digits))
    }

    /// Digits to hand to a notifier.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Constant-time comparison against a caller supplied code.
    #[must_use]
    pub fn matches(&self, supplied: &str) -> bool {
        self.expose().as_bytes().ct_eq(supplied.as_bytes()).into()
    }
}

impl std::fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OtpCode(***)")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordState {
    Pending,
    /// Consumed by a matching verification.
    Verified,
    /// Verify budget exhausted.
    Invalidated,
}

#[derive(Clone, Debug)]
pub struct OtpRecord {
    code: OtpCode,
    created_at: Instant,
    expires_at: Instant,
    state: RecordState,
    verify_attempts: u32,
    generation: u64,
}

impl OtpRecord {
    #[must_use]
    pub fn new(code: OtpCode, created_at: Instant, ttl: Duration) -> Self {
        Self {
            code,
            created_at,
            expires_at: created_at + ttl,
            state: RecordState::Pending,
            verify_attempts: 0,
            generation: 0,
        }
    }

    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    #[must_use]
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    #[must_use]
    pub fn state(&self) -> RecordState {
        self.state
    }

    #[must_use]
    pub fn verify_attempts(&self) -> u32 {
        self.verify_attempts
    }

    /// Issue number assigned by the store; tells a re-issued code apart from
    /// the one an attempt was checked against.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.state != RecordState::Pending
    }

    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Pending and not yet expired.
    #[must_use]
    pub fn is_live(&self, now: Instant) -> bool {
        !self.is_consumed() && !self.is_expired(now)
    }

    pub(super) fn code(&self) -> &OtpCode {
        &self.code
    }

    pub(super) fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }

    pub(super) fn record_attempt(&mut self) {
        self.verify_attempts = self.verify_attempts.saturating_add(1);
    }

    pub(super) fn mark(&mut self, state: RecordState) {
        if self.state == RecordState::Pending {
            self.state = state;
        }
    }
}

/// Store-level result of a consume call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Verified,
    Mismatched,
    /// Mismatch on the last allowed attempt; the record is now invalidated.
    Exhausted,
    Expired,
    NotFound,
}

/// Public result of `OtpService::verify_otp`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    Invalid,
    Expired,
    NotFound,
}

impl VerifyOutcome {
    #[must_use]
    pub const fn is_verified(self) -> bool {
        matches!(self, Self::Verified)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Invalid => "invalid",
            Self::Expired => "expired",
            Self::NotFound => "not_found",
        }
    }
}

impl From<ConsumeOutcome> for VerifyOutcome {
    fn from(outcome: ConsumeOutcome) -> Self {
        match outcome {
            ConsumeOutcome::Verified => Self::Verified,
            ConsumeOutcome::Mismatched | ConsumeOutcome::Exhausted => Self::Invalid,
            ConsumeOutcome::Expired => Self::Expired,
            ConsumeOutcome::NotFound => Self::NotFound,
        }
    }
}

/// Returned by a successful `OtpService::request_otp`. The code itself only
/// leaves the service through the notifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IssuedOtp {
    pub expires_in: Duration,
    pub delivered: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_debug_is_redacted() {
        let code = OtpCode::new("123456".to_string());
        assert_eq!(format!("{code:?}"), "OtpCode(***)");
        assert_eq!(code.expose(), "123456");
    }

    #[test]
    fn code_matches_only_exact_digits() {
        let code = OtpCode::new("012345".to_string());
        assert!(code.matches("012345"));
        assert!(!code.matches("12345"));
        assert!(!code.matches("012346"));
        assert!(!code.matches(""));
    }

    #[test]
    fn record_expires_at_ttl() {
        let now = Instant::now();
        let record = OtpRecord::new(
            OtpCode::new("000000".to_string()),
            now,
            Duration::from_secs(300),
        );
        assert_eq!(record.expires_at(), now + Duration::from_secs(300));
        assert!(record.is_live(now));
        assert!(!record.is_expired(now + Duration::from_secs(299)));
        assert!(record.is_expired(now + Duration::from_secs(300)));
    }

    #[test]
    fn terminal_state_is_sticky() {
        let now = Instant::now();
        let mut record = OtpRecord::new(
            OtpCode::new("000000".to_string()),
            now,
            Duration::from_secs(60),
        );
        record.mark(RecordState::Verified);
        record.mark(RecordState::Invalidated);
        assert_eq!(record.state(), RecordState::Verified);
        assert!(record.is_consumed());
        assert!(!record.is_live(now));
    }

    #[test]
    fn consume_outcome_maps_to_verify_outcome() {
        assert_eq!(
            VerifyOutcome::from(ConsumeOutcome::Mismatched),
            VerifyOutcome::Invalid
        );
        assert_eq!(
            VerifyOutcome::from(ConsumeOutcome::Exhausted),
            VerifyOutcome::Invalid
        );
        assert!(VerifyOutcome::from(ConsumeOutcome::Verified).is_verified());
        assert_eq!(VerifyOutcome::NotFound.as_str(), "not_found");
    }
}
