pub mod pg;
pub mod routes;

/// Tracing bootstrap for the executables; the configured level acts as the
/// default directive, RUST_LOG still overrides.
pub fn initialize_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
