use console::style;
use tracing_subscriber::EnvFilter;

/// Log level for the number of `-v` flags given.
pub fn level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs the global subscriber writing to stderr. `RUST_LOG` takes precedence over `verbosity`.
/// When a subscriber is already installed it is kept and the failure is reported on stderr.
pub fn init(verbosity: u8) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level(verbosity)));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    match installed {
        Ok(()) => true,
        Err(e) => {
            eprintln!("{} {}", style("warning: logging not initialised:").yellow(), e);
            false
        }
    }
}
