pub mod authorization;
pub mod metrics;
pub mod response;

pub use authorization::authorization_gate;
pub use metrics::track_metrics;
pub use response::{ApiResponse, ApiResult};
