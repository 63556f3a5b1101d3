use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::structures::db_err::DBError;


/// environment variable holding the filter directives, e.g. `tally=debug`
pub const LOG_VAR: &str = "TALLY_LOG";

const DEFAULT_FILTER: &str = "tally=info";
const VERBOSE_FILTER: &str = "tally=debug";


/// installs the global subscriber, writing to stderr.
///
/// `TALLY_LOG` wins over `verbose` when it is set. Only binaries call this,
/// the library just emits events.
pub fn init(verbose: bool) -> Result<(), DBError> {
    let fallback = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_env(LOG_VAR).unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .map_err(|e| DBError::Configuration(format!("could not install the log subscriber: {e}")))
}
