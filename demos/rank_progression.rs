//! Rank progression and the one-time career bonus.
//!
//! Walks a member up the ladder as group volume grows, then drops and
//! re-qualifies to show that career bonuses never pay twice.

use compensation_engine::core::ledger::BonusKind;
use compensation_engine::core::member::{Leg, Member, MemberId};
use compensation_engine::core::rank::RankTable;
use compensation_engine::engine::compensation::CompensationEngine;
use rust_decimal_macros::dec;

fn main() {
    println!("╔══════════════════════════════════════════════╗");
    println!("║  compensation-engine: Rank Progression       ║");
    println!("╚══════════════════════════════════════════════╝\n");

    let root = MemberId::new("M-ROOT");
    let alice = MemberId::new("M-A");
    let bob = MemberId::new("M-B");

    let mut tree = compensation_engine::tree::placement::PlacementTree::new();
    tree.insert_root(Member::new("M-ROOT", "You")).unwrap();
    let mut engine = CompensationEngine::new(RankTable::standard(), tree);
    engine
        .enroll(Member::new("M-A", "Alice"), &root, Some(Leg::Left))
        .unwrap();
    engine
        .enroll(Member::new("M-B", "Bob"), &root, Some(Leg::Right))
        .unwrap();

    println!("━━━ Climbing the ladder ━━━\n");
    let mut sales = dec!(0);
    while let Some(next) = {
        let current = engine.member(&root).unwrap().rank_id();
        engine.ranks().next(current).cloned()
    } {
        // Pour volume into both legs until the next threshold clears.
        while engine.stats(&root).unwrap().group_volume() < next.group_volume_qualified_2 {
            engine.record_sale(&alice, dec!(5_000)).unwrap();
            engine.record_sale(&bob, dec!(5_000)).unwrap();
            sales += dec!(10_000);
        }
        engine.set_rank(&alice, next.id - 1).unwrap();
        engine.set_rank(&bob, next.id - 1).unwrap();

        match engine.promote(&root).unwrap() {
            Some(rank_id) => {
                let stats = engine.stats(&root).unwrap();
                println!(
                    "reached {:<12} (group volume {:>10}, career total {:>8})",
                    engine.rank_name(i64::from(rank_id)),
                    stats.group_volume(),
                    stats.career_bonus_total,
                );
            }
            None => break,
        }
    }

    println!("\n━━━ Dropping and re-qualifying ━━━\n");
    let before = engine.ledger().total_for(&root, BonusKind::Career);
    engine.demote(&root).unwrap();
    engine.demote(&root).unwrap();
    engine.promote(&root).unwrap();
    engine.promote(&root).unwrap();
    let after = engine.ledger().total_for(&root, BonusKind::Career);

    println!("career bonuses before drop: {}", before);
    println!("career bonuses after re-qualifying: {}", after);
    println!("(total sales poured in: {})", sales);
}
