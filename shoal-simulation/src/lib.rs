//! Tick-based, parallel, spatially indexed fish-school simulation core.
//!
//! One control thread drives a per-tick phase machine; the per-agent update
//! step fans out across the rayon worker pool; published snapshots are
//! consumed by the render path through [`RenderFeed`].

pub mod feed;
pub mod grid;
pub mod scheduler;
pub mod school;
pub mod steer;

pub use feed::RenderFeed;
pub use grid::SpatialHashGrid;
pub use scheduler::{TickPhase, TickScheduler};
pub use school::SchoolState;

use thiserror::Error;

/// Startup failures. Once a scheduler is constructed, per-tick math is total
/// and no runtime errors are produced.
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] shoal_config::ConfigError),

    #[error("failed to allocate agent store: {0}")]
    Allocation(#[from] std::collections::TryReserveError),
}
