//! Shared CLI utilities.

pub mod logging;
pub mod progress;

pub use logging::initialize_logging;
