//! deploylist daemon library
//!
//! This module provides the runtime around the reconciler:
//! - Per-object workers that requeue themselves after each pass
//! - REST API to apply, inspect, delete and trigger objects
//! - Manifest loading and an on-disk status mirror
//! - Server lifecycle management

pub mod api;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod server;
pub mod storage;

pub use config::DaemonConfig;
pub use error::{ApiError, DaemonError, DaemonResult};
pub use scheduler::Scheduler;
pub use server::Server;
pub use storage::{load_manifests, FileStatusStore};
