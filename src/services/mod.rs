//! Detection pipeline stages and the clients they depend on.

pub mod credentials;
pub mod http_client;
pub mod log_query;
pub mod metrics;
pub mod notifier;
pub mod pipeline;
pub mod remediation;
pub mod report;
pub mod threshold;

pub use credentials::*;
pub use http_client::*;
pub use log_query::*;
pub use metrics::*;
pub use notifier::*;
pub use pipeline::*;
pub use remediation::*;
pub use report::*;
pub use threshold::*;
