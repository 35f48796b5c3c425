pub mod agent;
pub mod app_state;
pub mod collaborators;
pub mod config;
pub mod db;
pub mod http;
pub mod models;
pub mod pipeline;
pub mod workset;

use tracing_subscriber::EnvFilter;

/// Initialize structured logging from `RUST_LOG`, falling back to the
/// crate's default filter (spec §9 ambient-stack note: logging is an
/// external collaborator's concern, not the core's, but startup still
/// owns wiring it up).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::AppConfig::default_log_filter())),
        )
        .init();
}
