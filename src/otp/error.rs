use std::time::Duration;

/// Failures surfaced by [`super::OtpService`].
///
/// Verification results (`Invalid`, `Expired`, `NotFound`) are not errors and
/// live in [`super::VerifyOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("rate limited: retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },
    #[error("internal error: {0:#}")]
    Internal(#[source] anyhow::Error),
}

impl OtpError {
    /// Whole seconds a client should wait, rounded up so `0` is never advertised
    /// while the window is still closed.
    #[must_use]
    pub fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after } => {
                let secs = retry_after.as_secs();
                if retry_after.subsec_nanos() > 0 {
                    Some(secs.saturating_add(1))
                } else {
                    Some(secs.max(1))
                }
            }
            _ => None,
        }
    }
}

impl From<anyhow::Error> for OtpError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}
