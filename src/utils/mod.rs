//! Utility functions and helper modules.

pub mod logging;
pub mod redact;

pub use logging::*;
pub use redact::*;
