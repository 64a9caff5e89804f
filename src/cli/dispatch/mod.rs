//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to an [`Action`] carrying the full server
//! configuration.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{
    notifier, otp, ARG_CORS_ALLOWED_ORIGINS, ARG_LISTEN, ARG_PORT, ARG_REQUEST_TIMEOUT_SECONDS,
};
use anyhow::{Context, Result};
use std::net::{IpAddr, Ipv6Addr};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let listen = matches
        .get_one::<IpAddr>(ARG_LISTEN)
        .copied()
        .unwrap_or(IpAddr::V6(Ipv6Addr::UNSPECIFIED));
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let cors_allowed_origins = matches
        .get_many::<String>(ARG_CORS_ALLOWED_ORIGINS)
        .map(|values| {
            values
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let request_timeout_seconds = matches
        .get_one::<u64>(ARG_REQUEST_TIMEOUT_SECONDS)
        .copied()
        .context("missing required argument: --request-timeout-seconds")?;

    let otp_config = otp::parse(matches)?;
    let notifier_opts = notifier::Options::parse(matches)?;

    Ok(Action::Server(Args {
        listen,
        port,
        cors_allowed_origins,
        request_timeout_seconds,
        otp: otp_config,
        notifier: notifier_opts,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use anyhow::bail;
    use std::time::Duration;

    const TWILIO_VARS: [&str; 5] = [
        "OTPD_NOTIFIER",
        "OTPD_TWILIO_ACCOUNT_SID",
        "OTPD_TWILIO_AUTH_TOKEN",
        "OTPD_TWILIO_FROM_NUMBER",
        "OTPD_TWILIO_API_BASE",
    ];

    fn cleared_twilio_env() -> Vec<(&'static str, Option<&'static str>)> {
        TWILIO_VARS.iter().map(|name| (*name, None)).collect()
    }

    #[test]
    fn defaults_map_to_server_action() -> Result<()> {
        temp_env::with_vars(cleared_twilio_env(), || {
            let matches = commands::new().get_matches_from(vec!["otpd"]);
            let Action::Server(args) = handler(&matches)?;

            assert_eq!(args.port, 8080);
            assert_eq!(args.listen, IpAddr::V6(Ipv6Addr::UNSPECIFIED));
            assert_eq!(args.cors_allowed_origins, vec!["*".to_string()]);
            assert_eq!(args.request_timeout_seconds, 30);
            assert_eq!(args.otp.ttl(), Duration::from_secs(300));
            assert_eq!(args.otp.code_length(), 6);
            assert_eq!(args.otp.send_limit(), 3);
            assert_eq!(args.otp.send_window(), Duration::from_secs(600));
            assert_eq!(args.otp.verify_limit(), 5);
            assert!(matches!(args.notifier, notifier::Options::Log));
            Ok(())
        })
    }

    #[test]
    fn otp_arguments_flow_into_config() -> Result<()> {
        let matches = commands::new().get_matches_from(vec![
            "otpd",
            "--otp-ttl-seconds",
            "90",
            "--code-length",
            "8",
            "--verify-limit",
            "2",
            "--delivery-timeout-seconds",
            "4",
            "--sweep-interval-seconds",
            "15",
        ]);
        let Action::Server(args) = handler(&matches)?;

        assert_eq!(args.otp.ttl(), Duration::from_secs(90));
        assert_eq!(args.otp.code_length(), 8);
        assert_eq!(args.otp.verify_limit(), 2);
        assert_eq!(args.otp.delivery_timeout(), Duration::from_secs(4));
        assert_eq!(args.otp.sweep_interval(), Duration::from_secs(15));
        Ok(())
    }

    #[test]
    fn twilio_requires_credentials() {
        temp_env::with_vars(cleared_twilio_env(), || {
            let matches = commands::new().get_matches_from(vec![
                "otpd",
                "--notifier",
                "twilio",
                "--twilio-account-sid",
                "AC123",
            ]);
            let err = handler(&matches).err().map(|e| e.to_string());
            assert_eq!(
                err.as_deref(),
                Some(
                    "missing required argument: --twilio-auth-token (required for --notifier twilio)"
                )
            );
        });
    }

    #[test]
    fn twilio_options_from_env() -> Result<()> {
        temp_env::with_vars(
            [
                ("OTPD_NOTIFIER", Some("twilio")),
                ("OTPD_TWILIO_ACCOUNT_SID", Some("AC123")),
                ("OTPD_TWILIO_AUTH_TOKEN", Some("secret")),
                ("OTPD_TWILIO_FROM_NUMBER", Some("+15550000000")),
                ("OTPD_TWILIO_API_BASE", None),
            ],
            || {
                let matches = commands::new().get_matches_from(vec!["otpd"]);
                let Action::Server(args) = handler(&matches)?;
                let notifier::Options::Twilio(options) = args.notifier else {
                    bail!("expected twilio notifier options");
                };
                assert_eq!(options.account_sid, "AC123");
                assert_eq!(options.from_number, "+15550000000");
                assert!(options.api_base.is_none());
                assert!(!format!("{options:?}").contains("secret"));
                Ok(())
            },
        )
    }
}
