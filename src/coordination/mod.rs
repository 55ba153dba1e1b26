//! Account orchestration
//!
//! The scheduler:
//! 1. Spawns one task per account
//! 2. Bounds the number in flight with a shared semaphore
//! 3. Captures every task's error or panic as that account's status

pub mod scheduler;

pub use scheduler::{AccountScheduler, TaskStatus};
