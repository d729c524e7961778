//! Event handlers for poller events

pub mod console;

// Re-export for convenience
pub use console::ConsoleEventHandler;
