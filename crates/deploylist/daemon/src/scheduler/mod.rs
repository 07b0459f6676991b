//! Scheduler and per-object workers
//!
//! The scheduler is responsible for:
//! - Running one self-rescheduling worker per declared object
//! - Waking a worker early on an explicit trigger
//! - Periodically resyncing workers against the object store

mod worker;

pub use worker::Scheduler;
