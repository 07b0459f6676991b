//! Storage extensions for the daemon
//!
//! - [`FileStatusStore`]: mirrors each object's status to a JSON file
//! - [`load_manifests`]: reads declared objects from YAML manifests

mod file;
mod manifests;

pub use file::FileStatusStore;
pub use manifests::load_manifests;
