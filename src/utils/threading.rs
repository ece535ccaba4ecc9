//! # Threading Configuration
//!
//! Rayon pool setup. Panel construction is parallel over records; record
//! rendering is parallel over sample chunks.

use crate::error::{PgpError, Result};

/// Configure the global rayon pool. A pool that was already initialised is
/// left as is.
pub fn build_global_pool(n_threads: usize) -> Result<()> {
    if n_threads == 0 {
        return Err(PgpError::config("thread count must be at least 1"));
    }
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .thread_name(|i| format!("pgpref-worker-{}", i))
        .build_global()
    {
        tracing::debug!("global thread pool already configured: {}", e);
    }
    Ok(())
}
