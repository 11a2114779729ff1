//! tagbox/crates/tb-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Tagbox.

pub mod error;
pub mod models;
pub mod search;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use search::*;
pub use traits::*;
