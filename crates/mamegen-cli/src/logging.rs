use std::io;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;

/// Environment variable holding an `EnvFilter` directive, e.g. `mamegen_dsl=debug`.
pub const LOG_ENV: &str = "MAMEGEN_LOG";

/// Installs the stderr subscriber. `--verbose` lowers the default level from
/// `warn` to `info`; an explicit `MAMEGEN_LOG` always wins.
pub fn init_logging(verbose: bool, json: bool) -> Result<(), String> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_timer(UtcTime::rfc_3339())
            .with_writer(BoxMakeWriter::new(io::stderr))
    });
    let text_layer = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(BoxMakeWriter::new(io::stderr))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|err| err.to_string())
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose { "info" } else { "warn" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_default_level() {
        assert_eq!(default_directive(false), "warn");
        assert_eq!(default_directive(true), "info");
    }
}
