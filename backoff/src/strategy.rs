/// Exponential backoff with multiplicative jitter.
pub mod exponential;
