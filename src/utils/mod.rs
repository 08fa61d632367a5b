//! Utility modules for common functionality

pub mod deadline;
pub mod signal;

pub use deadline::with_deadline;
pub use signal::shutdown_signal;

// vim: ts=4
