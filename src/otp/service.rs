//! `OtpService`: the only entry point the HTTP layer talks to.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use super::clock::{Clock, SystemClock};
use super::codec::{CodeGenerator, OtpCodec};
use super::error::OtpError;
use super::limiter::{AttemptLimiter, LimitDecision, LimiterConfig};
use super::models::{ConsumeOutcome, IssuedOtp, OtpCode, OtpRecord, VerifyOutcome};
use super::notifier::Notifier;
use super::store::OtpStore;

const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
const DEFAULT_CODE_LENGTH: usize = 6;
const DEFAULT_SEND_LIMIT: u32 = 3;
const DEFAULT_SEND_WINDOW: Duration = Duration::from_secs(10 * 60);
const DEFAULT_VERIFY_LIMIT: u32 = 5;
const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const MAX_IDENTITY_LEN: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OtpConfig {
    ttl: Duration,
    code_length: usize,
    send_limit: u32,
    send_window: Duration,
    verify_limit: u32,
    delivery_timeout: Duration,
    sweep_interval: Duration,
}

impl OtpConfig {
    /// Defaults: 5 minute TTL, 6 digits, 3 sends per 10 minutes, 5 verify
    /// attempts per code, 10s delivery timeout, sweep every minute.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            code_length: DEFAULT_CODE_LENGTH,
            send_limit: DEFAULT_SEND_LIMIT,
            send_window: DEFAULT_SEND_WINDOW,
            verify_limit: DEFAULT_VERIFY_LIMIT,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_ttl_seconds(mut self, seconds: u64) -> Self {
        self.ttl = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_code_length(mut self, length: usize) -> Self {
        self.code_length = length;
        self
    }

    #[must_use]
    pub fn with_send_limit(mut self, limit: u32) -> Self {
        self.send_limit = limit;
        self
    }

    #[must_use]
    pub fn with_send_window_seconds(mut self, seconds: u64) -> Self {
        self.send_window = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_verify_limit(mut self, limit: u32) -> Self {
        self.verify_limit = limit;
        self
    }

    #[must_use]
    pub fn with_delivery_timeout_seconds(mut self, seconds: u64) -> Self {
        self.delivery_timeout = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_sweep_interval_seconds(mut self, seconds: u64) -> Self {
        self.sweep_interval = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn code_length(&self) -> usize {
        self.code_length
    }

    #[must_use]
    pub fn send_limit(&self) -> u32 {
        self.send_limit
    }

    #[must_use]
    pub fn send_window(&self) -> Duration {
        self.send_window
    }

    #[must_use]
    pub fn verify_limit(&self) -> u32 {
        self.verify_limit
    }

    #[must_use]
    pub fn delivery_timeout(&self) -> Duration {
        self.delivery_timeout
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    fn limiter_config(&self) -> LimiterConfig {
        LimiterConfig {
            send_limit: self.send_limit,
            send_window: self.send_window,
            verify_limit: self.verify_limit,
            verify_window: self.ttl,
        }
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub struct OtpService {
    config: OtpConfig,
    clock: Arc<dyn Clock>,
    generator: Arc<dyn CodeGenerator>,
    notifier: Arc<dyn Notifier>,
    limiter: AttemptLimiter,
    store: OtpStore,
}

impl OtpService {
    /// Build a service using the system clock and the OS CSPRNG.
    ///
    /// # Errors
    /// Returns an error if the configured code length is unsupported.
    pub fn new(config: OtpConfig, notifier: Arc<dyn Notifier>) -> anyhow::Result<Self> {
        let codec = OtpCodec::new(config.code_length)?;
        Ok(Self::with_parts(
            config,
            Arc::new(SystemClock),
            Arc::new(codec),
            notifier,
        ))
    }

    /// Build a service from explicit collaborators. The generator's code
    /// length takes precedence over `config`.
    #[must_use]
    pub fn with_parts(
        config: OtpConfig,
        clock: Arc<dyn Clock>,
        generator: Arc<dyn CodeGenerator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let config = config.with_code_length(generator.code_length());
        Self {
            limiter: AttemptLimiter::new(config.limiter_config()),
            store: OtpStore::new(),
            config,
            clock,
            generator,
            notifier,
        }
    }

    #[must_use]
    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    /// Issue a new code for `identity`, replacing any pending one.
    ///
    /// # Errors
    /// `Validation` for an unusable identity, `RateLimited` when the send
    /// window is spent, `Internal` when no code could be generated.
    #[instrument(skip_all)]
    pub async fn request_otp(&self, identity: &str) -> Result<IssuedOtp, OtpError> {
        validate_identity(identity)?;
        let now = self.clock.now();

        if let LimitDecision::Denied { retry_after } = self.limiter.check_send(identity, now) {
            debug!(retry_after = retry_after.as_secs(), "send rate limited");
            return Err(OtpError::RateLimited { retry_after });
        }

        let code = self.generator.generate().map_err(|err| {
            error!("Failed to generate OTP: {err:#}");
            OtpError::Internal(err)
        })?;

        // Fresh budget first so attempts racing the swap count against the new code.
        self.limiter.reset_verify(identity);
        self.store
            .put(identity, OtpRecord::new(code.clone(), now, self.config.ttl));

        let delivered = self.deliver(identity, &code).await;

        Ok(IssuedOtp {
            expires_in: self.config.ttl,
            delivered,
        })
    }

    /// Check `supplied` against the pending code for `identity`.
    ///
    /// Every well-formed attempt spends verify budget, whatever its outcome.
    ///
    /// # Errors
    /// `Validation` for a malformed identity or code, `RateLimited` once the
    /// verify budget is spent (the pending code is invalidated at that point).
    #[instrument(skip_all)]
    pub fn verify_otp(&self, identity: &str, supplied: &str) -> Result<VerifyOutcome, OtpError> {
        validate_identity(identity)?;
        self.validate_code(supplied)?;
        let now = self.clock.now();

        // Pin the record this attempt is checked against before spending budget;
        // a code re-issued from here on is never touched by this attempt.
        let generation = self.store.generation(identity);

        let remaining = match self.limiter.check_verify(identity, now) {
            LimitDecision::Allowed { remaining } => remaining,
            LimitDecision::Denied { retry_after } => {
                let invalidated =
                    generation.is_some_and(|generation| self.store.invalidate(identity, generation));
                if invalidated {
                    info!("verify budget spent, pending OTP invalidated");
                }
                debug!(retry_after = retry_after.as_secs(), "verify rate limited");
                return Err(OtpError::RateLimited { retry_after });
            }
        };

        let consumed = generation.map_or(ConsumeOutcome::NotFound, |generation| {
            self.store
                .consume(identity, generation, supplied, now, remaining == 0)
        });
        if consumed == ConsumeOutcome::Exhausted {
            info!("verify budget spent, pending OTP invalidated");
        }

        let outcome = VerifyOutcome::from(consumed);
        if outcome.is_verified() {
            self.limiter.reset_verify(identity);
        }

        debug!(outcome = outcome.as_str(), "otp verification");
        Ok(outcome)
    }

    /// Garbage-collect expired records and elapsed windows.
    /// Returns `(records_removed, windows_removed)`.
    pub fn sweep(&self) -> (usize, usize) {
        let now = self.clock.now();
        (self.store.sweep(now), self.limiter.sweep(now))
    }

    #[must_use]
    pub fn pending_records(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn tracked_windows(&self) -> usize {
        self.limiter.window_count()
    }

    /// Whether `identity` currently has a live code.
    #[must_use]
    pub fn has_pending(&self, identity: &str) -> bool {
        self.store.get(identity, self.clock.now()).is_some()
    }

    async fn deliver(&self, identity: &str, code: &OtpCode) -> bool {
        match timeout(
            self.config.delivery_timeout,
            self.notifier.send(identity, code),
        )
        .await
        {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                warn!("OTP delivery failed, code stays valid: {err:#}");
                false
            }
            Err(_) => {
                warn!(
                    timeout_seconds = self.config.delivery_timeout.as_secs(),
                    "OTP delivery timed out, code stays valid"
                );
                false
            }
        }
    }

    fn validate_code(&self, supplied: &str) -> Result<(), OtpError> {
        if supplied.len() != self.config.code_length
            || !supplied.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(OtpError::Validation(format!(
                "code must be {} digits",
                self.config.code_length
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for OtpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpService")
            .field("config", &self.config)
            .field("pending_records", &self.store.len())
            .field("tracked_windows", &self.limiter.window_count())
            .finish_non_exhaustive()
    }
}

fn validate_identity(identity: &str) -> Result<(), OtpError> {
    if identity.trim().is_empty() {
        return Err(OtpError::Validation("identity is required".to_string()));
    }
    if identity.len() > MAX_IDENTITY_LEN {
        return Err(OtpError::Validation(format!(
            "identity must be at most {MAX_IDENTITY_LEN} bytes"
        )));
    }
    Ok(())
}
