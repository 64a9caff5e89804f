use crate::otp::{OtpConfig, MAX_CODE_LENGTH, MIN_CODE_LENGTH};
use anyhow::Result;
use clap::{Arg, ArgMatches, Command};

pub const ARG_OTP_TTL_SECONDS: &str = "otp-ttl-seconds";
pub const ARG_CODE_LENGTH: &str = "code-length";
pub const ARG_SEND_LIMIT: &str = "send-limit";
pub const ARG_SEND_WINDOW_SECONDS: &str = "send-window-seconds";
pub const ARG_VERIFY_LIMIT: &str = "verify-limit";
pub const ARG_DELIVERY_TIMEOUT_SECONDS: &str = "delivery-timeout-seconds";
pub const ARG_SWEEP_INTERVAL_SECONDS: &str = "sweep-interval-seconds";

/// Parse OTP lifecycle arguments into an [`OtpConfig`].
///
/// # Errors
/// Returns an error if a required argument is missing.
pub fn parse(matches: &ArgMatches) -> Result<OtpConfig> {
    let read_u64 = |id: &str| -> Result<u64> {
        matches
            .get_one::<u64>(id)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
    };
    let read_u32 = |id: &str| -> Result<u32> {
        matches
            .get_one::<u32>(id)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
    };
    let code_length = matches
        .get_one::<u8>(ARG_CODE_LENGTH)
        .copied()
        .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_CODE_LENGTH}"))?;

    Ok(OtpConfig::new()
        .with_ttl_seconds(read_u64(ARG_OTP_TTL_SECONDS)?)
        .with_code_length(usize::from(code_length))
        .with_send_limit(read_u32(ARG_SEND_LIMIT)?)
        .with_send_window_seconds(read_u64(ARG_SEND_WINDOW_SECONDS)?)
        .with_verify_limit(read_u32(ARG_VERIFY_LIMIT)?)
        .with_delivery_timeout_seconds(read_u64(ARG_DELIVERY_TIMEOUT_SECONDS)?)
        .with_sweep_interval_seconds(read_u64(ARG_SWEEP_INTERVAL_SECONDS)?))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let code_lengths = i64::try_from(MIN_CODE_LENGTH).unwrap_or(4)
        ..=i64::try_from(MAX_CODE_LENGTH).unwrap_or(10);

    command
        .arg(
            Arg::new(ARG_OTP_TTL_SECONDS)
                .long(ARG_OTP_TTL_SECONDS)
                .help("Lifetime of an issued code in seconds")
                .env("OTPD_OTP_TTL_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_CODE_LENGTH)
                .long(ARG_CODE_LENGTH)
                .help("Number of digits in a code")
                .env("OTPD_CODE_LENGTH")
                .default_value("6")
                .value_parser(clap::value_parser!(u8).range(code_lengths)),
        )
        .arg(
            Arg::new(ARG_SEND_LIMIT)
                .long(ARG_SEND_LIMIT)
                .help("Codes an identity may request per send window")
                .env("OTPD_SEND_LIMIT")
                .default_value("3")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_SEND_WINDOW_SECONDS)
                .long(ARG_SEND_WINDOW_SECONDS)
                .help("Send rate-limit window in seconds")
                .env("OTPD_SEND_WINDOW_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_VERIFY_LIMIT)
                .long(ARG_VERIFY_LIMIT)
                .help("Verify attempts allowed against one pending code")
                .env("OTPD_VERIFY_LIMIT")
                .default_value("5")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_DELIVERY_TIMEOUT_SECONDS)
                .long(ARG_DELIVERY_TIMEOUT_SECONDS)
                .help("Maximum time to wait for the notifier in seconds")
                .env("OTPD_DELIVERY_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_SWEEP_INTERVAL_SECONDS)
                .long(ARG_SWEEP_INTERVAL_SECONDS)
                .help("Interval between sweeps of expired codes and windows")
                .env("OTPD_SWEEP_INTERVAL_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
