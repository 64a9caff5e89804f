use crate::cli::{
    actions::Action,
    commands::{self, logging},
    dispatch, telemetry,
};
use anyhow::Result;

/// Parse the command line, install logging and resolve the [`Action`] the
/// binary should run.
///
/// # Errors
///
/// Returns an error if telemetry initialization or action dispatch fails
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    let logging = logging::Options::parse(&matches);
    telemetry::init(logging.level(), logging.format)?;

    dispatch::handler(&matches)
}
