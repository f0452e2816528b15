//! The compensation engine and its derived calculations.

pub mod bonus;
pub mod compensation;
pub mod stats;
