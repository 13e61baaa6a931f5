//! Custodia Common Types
//!
//! This crate contains shared types used across the Custodia balance
//! platform, including identifiers, monetary types, and the error taxonomy
//! surfaced to the administrative console.

pub mod error;
pub mod identifiers;
pub mod monetary;
pub mod time;

pub use error::*;
pub use identifiers::*;
pub use monetary::*;
pub use time::*;
