//! Utility modules for seedling-elab

pub mod db_retry;
pub mod seed_locks;

pub use db_retry::{retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS};
pub use seed_locks::SeedLocks;
