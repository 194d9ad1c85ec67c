pub mod analyze;
pub mod config;
pub mod context;
pub mod discover;
pub mod error;
pub mod external;
pub mod http_client;
pub mod output;
pub mod pipeline;
pub mod probe;

pub use crate::error::ReconError;
pub use crate::pipeline::Pipeline;
