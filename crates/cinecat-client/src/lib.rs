//! # cinecat-client
//!
//! The synchronization store of the community feature set: an in-memory
//! session cache with per-family load state, mediating between a
//! presentation layer and the remote document store. Presentation code calls
//! the action methods and re-renders from [`CommunityStore::snapshot`];
//! nothing else may mutate the cache.

pub mod actions;
pub mod auth;
pub mod config;
pub mod state;
pub mod store;

mod error;

use tracing_subscriber::{fmt, EnvFilter};

pub use auth::{CurrentUser, Identity, StaticIdentity};
pub use config::ClientConfig;
pub use error::ClientError;
pub use state::{CommunityState, FamilyStatus, LoadPhase};
pub use store::CommunityStore;

/// Initialise logging for binaries. Honours `RUST_LOG`, defaulting to debug
/// output from the cinecat crates only.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cinecat_client=debug,cinecat_store=debug,warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
