//! Cache orchestrator - resolves info hashes against the record store and
//! upstream, refreshing stale records in the background.
//!
//! The orchestrator decides per lookup whether to serve the stored record,
//! serve it while refreshing, or fetch synchronously. At most one background
//! refresh runs per info hash at any time.

mod inflight;
mod runner;
mod types;

pub use inflight::{RefreshGuard, RefreshTracker};
pub use runner::CacheOrchestrator;
pub use types::{LookupError, OrchestratorStatus, Resolution, ResolutionSource};
