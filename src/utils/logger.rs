use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn base_layer<S>() -> fmt::Layer<S> {
    fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

pub fn init_cli_logger(verbose: bool) {
    let filter = if verbose {
        env_filter("geo_etl=debug,info")
    } else {
        env_filter("geo_etl=info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(base_layer().compact())
        .init();
}

/// JSON lines on stdout, for runs whose output is collected by a scheduler.
pub fn init_json_logger() {
    tracing_subscriber::registry()
        .with(env_filter("geo_etl=info"))
        .with(base_layer().json())
        .init();
}
