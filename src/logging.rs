use tracing_subscriber::EnvFilter;

/// Initialize stderr logging.
///
/// `RUST_LOG` wins when set; otherwise `pr_pulse=info`, or `pr_pulse=debug`
/// with `--verbose`. Logs never go to stdout, which carries host commands.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pr_pulse={default_level}")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .compact()
        .try_init();
}
