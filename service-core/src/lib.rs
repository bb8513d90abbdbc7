//! service-core: Shared infrastructure for billing domain crates.
pub mod clock;
pub mod error;
pub mod observability;

pub use serde;
pub use serde_json;
pub use tracing;
