//! Backoff strategies expressed as [`Iterator`]s of [`std::time::Duration`]. Each call to `next`
//! yields how long to cool off before the next attempt; `None` means the caller should give up.

pub mod strategy;
