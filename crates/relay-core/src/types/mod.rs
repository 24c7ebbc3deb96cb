//! Core data types shared by the feed, the store and the fanout.

pub mod quote;
pub mod snapshot;
pub mod symbol;

pub use quote::*;
pub use snapshot::*;
pub use symbol::*;
