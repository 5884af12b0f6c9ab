use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Structured logging to stderr. `RUST_LOG` wins over the verbosity flag.
pub fn init_tracing(verbosity: u8, json: bool) {
    let fallback = match verbosity {
        0 => "warn,aidetect=info",
        1 => "info,aidetect=debug",
        _ => "debug,aidetect=trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
