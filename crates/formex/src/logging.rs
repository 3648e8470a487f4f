use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Log to stderr so stdout carries nothing but program output.
///
/// `RUST_LOG` directives are honoured; `verbose` sets the floor
/// (0 warn, 1 info, 2+ debug).
pub fn init(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}
