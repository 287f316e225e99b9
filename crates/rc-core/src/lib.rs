//! rusty-comments/crates/rc-core/src/lib.rs
//!
//! The central domain model and interface definitions for the content store.

pub mod error;
pub mod id;
pub mod models;
pub mod traits;
pub mod validation;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use traits::*;
