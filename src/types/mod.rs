//! Core types for Sift.

pub mod session;
pub mod snapshot;

pub use session::*;
pub use snapshot::*;
