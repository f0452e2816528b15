//! # compensation-engine
//!
//! Binary-tree MLM compensation engine.
//!
//! Given a network of members placed into a left/right binary tree and
//! linked by a separate sponsorship chain, this engine computes rank
//! qualification, leg-volume aggregation, and the four bonuses of the
//! compensation plan (direct-sales, generation, pay-leg, career).
//!
//! ## Architecture
//!
//! - **core** — Foundational types: ranks, members, the bonus ledger
//! - **tree** — Binary placement tree and the sponsorship index
//! - **engine** — The compensation engine, stats derivation, bonus formulas
//! - **simulation** — Random network generation for stress testing

pub mod core;
pub mod engine;
pub mod simulation;
pub mod tree;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::core::ledger::{BonusEntry, BonusKind, BonusLedger};
    pub use crate::core::member::{Leg, Member, MemberId};
    pub use crate::core::rank::{Rank, RankTable};
    pub use crate::engine::bonus::BonusSchedule;
    pub use crate::engine::compensation::CompensationEngine;
    pub use crate::engine::stats::MemberStats;
    pub use crate::tree::placement::PlacementTree;
    pub use crate::tree::sponsorship::SponsorshipIndex;
}
