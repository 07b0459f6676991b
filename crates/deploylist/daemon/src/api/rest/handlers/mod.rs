//! API request handlers

mod health;
mod objects;

pub use health::*;
pub use objects::*;
