//! Random network generation for the compensation engine.
//!
//! Builds member trees of arbitrary size to exercise volume
//! aggregation, stats derivation, and bonus accrual under load.

use crate::core::member::{Member, MemberId};
use crate::tree::placement::PlacementTree;
use rand::Rng;
use rust_decimal::Decimal;

/// Configuration for generating a random member network.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Number of members, root included.
    pub member_count: usize,
    /// Minimum personal volume per member.
    pub min_volume: Decimal,
    /// Maximum personal volume per member.
    pub max_volume: Decimal,
    /// Chance (0.0-1.0) that a new recruit is sponsored by the root
    /// rather than by a random earlier member.
    pub root_sponsor_ratio: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            member_count: 15,
            min_volume: Decimal::from(50),
            max_volume: Decimal::from(2_000),
            root_sponsor_ratio: 0.3,
        }
    }
}

/// Generate a random member network.
///
/// The first member is the root; every later member is enrolled with
/// spillover placement under a random sponsor, so the result is always
/// a well-formed binary tree.
pub fn generate_random_network(config: &NetworkConfig) -> PlacementTree {
    let mut rng = rand::thread_rng();
    let mut tree = PlacementTree::new();

    let ids: Vec<MemberId> = (0..config.member_count)
        .map(|i| MemberId::new(format!("MEMBER-{:04}", i)))
        .collect();

    let min = config.min_volume;
    let span = (config.max_volume - config.min_volume).max(Decimal::ZERO);
    let volume = |rng: &mut rand::rngs::ThreadRng| {
        let f: f64 = rng.gen_range(0.0..1.0);
        let offset = span * Decimal::try_from(f).unwrap_or(Decimal::ZERO);
        (min + offset).round_dp(2)
    };

    let root_volume = volume(&mut rng);
    tree.insert_root(
        Member::new(ids[0].clone(), "Member 0000").with_personal_volume(root_volume),
    )
    .expect("empty tree accepts a root");

    for i in 1..config.member_count {
        let sponsor = if i == 1 || rng.gen_bool(config.root_sponsor_ratio) {
            ids[0].clone()
        } else {
            ids[rng.gen_range(0..i)].clone()
        };
        let member = Member::new(ids[i].clone(), format!("Member {:04}", i))
            .with_personal_volume(volume(&mut rng));
        tree.place(member, &sponsor, None)
            .expect("spillover always finds an open slot");
    }

    tree
}
