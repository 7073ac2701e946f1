//! Data models shared across the pipeline stages.

pub mod alert;
pub mod records;
pub mod token;

pub use alert::*;
pub use records::*;
pub use token::*;
