//! Client configuration.
//!
//! Everything has a sensible default so the store can be constructed with
//! zero configuration.

use cinecat_shared::constants::DEFAULT_PAGE_SIZE;

/// Tuning knobs for the synchronization store.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Posts fetched per page.
    /// Default: `20`
    pub page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}
