use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the stderr subscriber used by the CLI.
///
/// `RUST_LOG` overrides the default filter. Without it only warnings are
/// shown, or debug events from this crate with `verbose`.
pub fn init_cli_logger(verbose: bool) {
    let default = if verbose {
        "venv_patcher=debug,warn"
    } else {
        "venv_patcher=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A second init (tests driving main twice) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();
}
