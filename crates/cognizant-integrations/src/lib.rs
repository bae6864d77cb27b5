pub mod http;
pub mod log_service;
pub mod traits;

pub use log_service::{LogServiceClient, DEFAULT_LOG_SERVICE_URL};
pub use traits::{LogCollaborator, PostAck, TestResult, UsageRecord};
