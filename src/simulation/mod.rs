//! Stress-testing utilities: random network generation.

pub mod network_gen;
