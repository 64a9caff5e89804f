use crate::otp::TwilioOptions;
use anyhow::{anyhow, Result};
use clap::{builder::PossibleValuesParser, Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_NOTIFIER: &str = "notifier";
pub const ARG_TWILIO_ACCOUNT_SID: &str = "twilio-account-sid";
pub const ARG_TWILIO_AUTH_TOKEN: &str = "twilio-auth-token";
pub const ARG_TWILIO_FROM_NUMBER: &str = "twilio-from-number";
pub const ARG_TWILIO_API_BASE: &str = "twilio-api-base";

#[derive(Debug, Clone)]
pub enum Options {
    /// Log codes instead of delivering them (local development).
    Log,
    Twilio(TwilioOptions),
}

impl Options {
    /// Parse notifier arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the Twilio notifier is selected without credentials.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let kind = matches
            .get_one::<String>(ARG_NOTIFIER)
            .map_or("log", String::as_str);

        if kind != "twilio" {
            return Ok(Self::Log);
        }

        let read_required = |id: &str| -> Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("missing required argument: --{id} (required for --notifier twilio)"))
        };

        Ok(Self::Twilio(TwilioOptions {
            account_sid: read_required(ARG_TWILIO_ACCOUNT_SID)?,
            auth_token: SecretString::from(read_required(ARG_TWILIO_AUTH_TOKEN)?),
            from_number: read_required(ARG_TWILIO_FROM_NUMBER)?,
            api_base: matches.get_one::<String>(ARG_TWILIO_API_BASE).cloned(),
        }))
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_NOTIFIER)
                .long(ARG_NOTIFIER)
                .help("How issued codes are delivered")
                .env("OTPD_NOTIFIER")
                .default_value("log")
                .value_parser(PossibleValuesParser::new(["log", "twilio"])),
        )
        .arg(
            Arg::new(ARG_TWILIO_ACCOUNT_SID)
                .long(ARG_TWILIO_ACCOUNT_SID)
                .help("Twilio account SID")
                .env("OTPD_TWILIO_ACCOUNT_SID"),
        )
        .arg(
            Arg::new(ARG_TWILIO_AUTH_TOKEN)
                .long(ARG_TWILIO_AUTH_TOKEN)
                .help("Twilio auth token")
                .env("OTPD_TWILIO_AUTH_TOKEN")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_TWILIO_FROM_NUMBER)
                .long(ARG_TWILIO_FROM_NUMBER)
                .help("Sender phone number for SMS delivery")
                .env("OTPD_TWILIO_FROM_NUMBER"),
        )
        .arg(
            Arg::new(ARG_TWILIO_API_BASE)
                .long(ARG_TWILIO_API_BASE)
                .help("Twilio API base URL")
                .env("OTPD_TWILIO_API_BASE"),
        )
}
