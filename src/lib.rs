// Public modules
pub mod config;
pub mod database;
pub mod domains;
pub mod errors;
pub mod validation;

pub use config::FeesConfig;
pub use database::{DocumentStore, InMemoryDocumentStore};
pub use domains::fee::{FeeService, FeeServiceImpl};
pub use errors::{DomainError, ServiceError, StoreError, ValidationError};

/// Initialize logging for the library.
/// Defaults RUST_LOG to `debug` in debug builds and `info` otherwise; safe to call more than once.
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        #[cfg(debug_assertions)]
        std::env::set_var("RUST_LOG", "debug");
        #[cfg(not(debug_assertions))]
        std::env::set_var("RUST_LOG", "info");
    }

    // Initialize env_logger if not already initialized
    let _ = env_logger::try_init();
    log::debug!("Logging initialized");
}
