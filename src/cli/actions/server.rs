use crate::{
    api,
    cli::{commands::notifier, telemetry},
    otp::{spawn_sweeper, LogNotifier, Notifier, OtpConfig, OtpService, TwilioNotifier},
};
use anyhow::{Context, Result};
use std::{net::IpAddr, sync::Arc, time::Duration};
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub listen: IpAddr,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub request_timeout_seconds: u64,
    pub otp: OtpConfig,
    pub notifier: notifier::Options,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the notifier cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let notifier = build_notifier(&args.notifier, args.otp.delivery_timeout())?;
    let service = Arc::new(
        OtpService::new(args.otp, notifier).context("Failed to initialize OTP service")?,
    );

    let sweeper = spawn_sweeper(service.clone(), args.otp.sweep_interval());

    let api_config = api::ServerConfig::new(args.listen, args.port)
        .with_cors_allowed_origins(args.cors_allowed_origins)
        .with_request_timeout(Duration::from_secs(args.request_timeout_seconds));

    let result = api::new(api_config, service).await;

    sweeper.abort();
    telemetry::shutdown_tracer();

    result
}

fn build_notifier(options: &notifier::Options, timeout: Duration) -> Result<Arc<dyn Notifier>> {
    match options {
        notifier::Options::Log => {
            warn!("Using the log notifier: codes are written to the log and not delivered");
            Ok(Arc::new(LogNotifier))
        }
        notifier::Options::Twilio(twilio) => {
            let notifier = TwilioNotifier::new(twilio.clone(), timeout)
                .context("Failed to build Twilio notifier")?;
            Ok(Arc::new(notifier))
        }
    }
}

fn log_startup_args(args: &Args) {
    let notifier = match args.notifier {
        notifier::Options::Log => "log",
        notifier::Options::Twilio(_) => "twilio",
    };
    let entries = [
        ("listen", format!("[{}]:{}", args.listen, args.port)),
        ("cors_allowed_origins", args.cors_allowed_origins.join(",")),
        (
            "request_timeout",
            format!("{}s", args.request_timeout_seconds),
        ),
        ("otp_ttl", format!("{}s", args.otp.ttl().as_secs())),
        ("code_length", args.otp.code_length().to_string()),
        (
            "send_limit",
            format!(
                "{} per {}s",
                args.otp.send_limit(),
                args.otp.send_window().as_secs()
            ),
        ),
        ("verify_limit", args.otp.verify_limit().to_string()),
        (
            "delivery_timeout",
            format!("{}s", args.otp.delivery_timeout().as_secs()),
        ),
        (
            "sweep_interval",
            format!("{}s", args.otp.sweep_interval().as_secs()),
        ),
        ("notifier", notifier.to_string()),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
