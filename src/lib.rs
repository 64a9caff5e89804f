//! # otpd (One-Time Passcode Service)
//!
//! `otpd` issues short-lived numeric passcodes against a phone number (the
//! *identity*) and verifies them over HTTP.
//!
//! ## Lifecycle
//!
//! - **Issue:** `POST /api/send-otp` generates a random code from the OS CSPRNG,
//!   stores it with a TTL and hands it to the configured notifier.
//! - **Verify:** `POST /api/verify-otp` consumes the code exactly once. Wrong,
//!   expired and unknown codes all answer `400 Invalid OTP` so callers cannot
//!   tell which identities have a pending code.
//!
//! ## Abuse Protection
//!
//! Sends and verifications are throttled per identity with independent budgets:
//! a send window limits SMS flooding and a per-code verify budget limits
//! guessing. Exhausting the verify budget invalidates the pending code.
//!
//! State lives in sharded in-memory maps owned by [`otp::OtpService`]; there is
//! no process-wide global.

pub mod api;
pub mod cli;
pub mod otp;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
