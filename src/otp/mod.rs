//! OTP lifecycle: generation, storage with expiry, throttling and verification.
//!
//! Flow Overview:
//! 1) `OtpService::request_otp` checks the send window, generates a code and
//!    stores it, replacing any pending code for the identity.
//! 2) The code is handed to a [`Notifier`] after every map guard is released,
//!    so a slow delivery never blocks other identities.
//! 3) `OtpService::verify_otp` spends one attempt of the per-code verify budget
//!    and consumes the record on a constant-time match.
//!
//! Both maps are sharded (`DashMap`): operations on one identity are serialized
//! inside a shard entry, unrelated identities proceed independently.

mod clock;
mod codec;
mod error;
mod limiter;
mod models;
mod notifier;
mod service;
mod store;
mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{CodeGenerator, OtpCodec, MAX_CODE_LENGTH, MIN_CODE_LENGTH};
pub use error::OtpError;
pub use limiter::{AttemptLimiter, LimitDecision, LimiterConfig};
pub use models::{ConsumeOutcome, IssuedOtp, OtpCode, OtpRecord, RecordState, VerifyOutcome};
pub use notifier::{LogNotifier, Notifier, TwilioNotifier, TwilioOptions};
pub use service::{OtpConfig, OtpService};
pub use store::OtpStore;
pub use sweeper::spawn_sweeper;
