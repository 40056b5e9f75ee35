pub mod config;
pub mod core_state;
pub mod document_store;
pub mod models;
pub mod notifications;
pub mod pipeline;
pub mod query;
pub mod session;
pub mod storage;

pub use core_state::{CoreError, CoreState};
pub use document_store::{DocumentStore, StoreError};
pub use query::QueryEngine;
pub use session::SessionStore;

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` wins over the default
/// filter. Calling it again is a no-op.
pub fn init_tracing() {
    let result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();

    if result.is_ok() {
        tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_twice_is_harmless() {
        init_tracing();
        init_tracing();
    }
}
