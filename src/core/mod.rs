//! Foundational types: ranks, members, and the bonus ledger.

pub mod ledger;
pub mod member;
pub mod rank;
