mod service;

pub use service::{is_expired, CleanupService};
