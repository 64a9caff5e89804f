pub mod logging;
pub mod notifier;
pub mod otp;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_LISTEN: &str = "listen";
pub const ARG_PORT: &str = "port";
pub const ARG_CORS_ALLOWED_ORIGINS: &str = "cors-allowed-origins";
pub const ARG_REQUEST_TIMEOUT_SECONDS: &str = "request-timeout-seconds";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("otpd")
        .about("One-time passcode issuance and verification")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles);

    let command = with_server_args(command);
    let command = otp::with_args(command);
    let command = notifier::with_args(command);
    logging::with_args(command)
}

fn with_server_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_LISTEN)
                .short('l')
                .long(ARG_LISTEN)
                .help("Address to listen on")
                .default_value("::")
                .env("OTPD_LISTEN")
                .value_parser(clap::value_parser!(std::net::IpAddr)),
        )
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("OTPD_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_CORS_ALLOWED_ORIGINS)
                .long(ARG_CORS_ALLOWED_ORIGINS)
                .help("Comma separated origins allowed by CORS, `*` allows any")
                .default_value("*")
                .env("OTPD_CORS_ALLOWED_ORIGINS")
                .value_delimiter(','),
        )
        .arg(
            Arg::new(ARG_REQUEST_TIMEOUT_SECONDS)
                .long(ARG_REQUEST_TIMEOUT_SECONDS)
                .help("Maximum time to serve a request in seconds")
                .default_value("30")
                .env("OTPD_REQUEST_TIMEOUT_SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
