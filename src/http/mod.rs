/// HTTP layer: client configuration and prediction endpoint tasks.
pub mod client;
pub mod tasks;
