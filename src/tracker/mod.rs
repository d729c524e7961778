//! Polling schedules and the registry of tracked entities

pub mod poller;
pub mod registry;

// Re-export for convenience
pub use poller::{PollState, Poller, TickOutcome};
pub use registry::Registry;
