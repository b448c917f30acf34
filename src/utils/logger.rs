use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output shape of the log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Short single-line records for an interactive terminal.
    Compact,
    /// One JSON object per line, for log shippers.
    Json,
}

/// Filter used when `RUST_LOG` is not set. HTTP client chatter stays at
/// warn unless asked for.
pub fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "warn,chauffeur_availability=debug,reqwest=info"
    } else {
        "warn,chauffeur_availability=info"
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides the defaults.
pub fn init_logger(format: LogFormat, verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let compact = (format == LogFormat::Compact).then(|| {
        fmt::layer()
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
    });
    let json = (format == LogFormat::Json).then(|| {
        fmt::layer()
            .with_target(true)
            .json()
            .with_current_span(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(compact)
        .with(json)
        .init();
}
