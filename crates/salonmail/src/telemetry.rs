use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise info for our own crates.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "salonmail=info,salonmail_worker=info,salonmailctl=info".into()),
        )
        .with_target(false)
        .init();
}
