use crate::cli::telemetry::LogFormat;
use clap::{
    builder::{PossibleValuesParser, ValueParser},
    Arg, ArgAction, ArgMatches, Command,
};
use tracing::Level;

pub const ARG_VERBOSITY: &str = "verbosity";
pub const ARG_LOG_FORMAT: &str = "log-format";

const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Logging options shared by every subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    pub verbosity: u8,
    pub format: LogFormat,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        let verbosity = matches.get_one::<u8>(ARG_VERBOSITY).copied().unwrap_or(0);
        let format = match matches.get_one::<String>(ARG_LOG_FORMAT).map(String::as_str) {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        Self { verbosity, format }
    }

    /// `None` keeps the subscriber default (ERROR); each `-v` raises it a step.
    #[must_use]
    pub const fn level(&self) -> Option<Level> {
        match self.verbosity {
            0 => None,
            1 => Some(Level::WARN),
            2 => Some(Level::INFO),
            3 => Some(Level::DEBUG),
            _ => Some(Level::TRACE),
        }
    }
}

/// Accepts a level name (`info`) or its position in [`LEVEL_NAMES`] (`2`).
#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(|level: &str| -> Result<u8, String> {
        let level = level.trim().to_ascii_lowercase();
        LEVEL_NAMES
            .iter()
            .position(|name| *name == level)
            .and_then(|index| u8::try_from(index).ok())
            .or_else(|| level.parse::<u8>().ok().filter(|count| *count <= 4))
            .ok_or_else(|| format!("invalid log level, expected one of {}", LEVEL_NAMES.join(", ")))
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_VERBOSITY)
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("OTPD_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .arg(
            Arg::new(ARG_LOG_FORMAT)
                .long(ARG_LOG_FORMAT)
                .help("Log output format")
                .env("OTPD_LOG_FORMAT")
                .default_value("text")
                .global(true)
                .value_parser(PossibleValuesParser::new(["text", "json"])),
        )
}
