//! Configuration structures and loading utilities.
//!
//! Every setting is read from the environment first; the command line can
//! override the detector settings afterwards.

pub mod credentials;
pub mod detector;
pub mod http_client;
pub mod logging;
pub mod metrics;

pub use credentials::*;
pub use detector::*;
pub use logging::*;
pub use metrics::*;

/// Read an environment variable, treating blank values as unset.
pub(crate) fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
