//! Basic compensation walkthrough.
//!
//! Builds a small team, records some sales, and shows how leg volumes,
//! the pay-leg split, and the bonus ledger evolve.

use compensation_engine::core::member::{Leg, Member, MemberId};
use compensation_engine::core::rank::RankTable;
use compensation_engine::engine::compensation::CompensationEngine;
use compensation_engine::tree::placement::PlacementTree;
use rust_decimal_macros::dec;

fn main() {
    println!("╔══════════════════════════════════════════════╗");
    println!("║  compensation-engine: Basic Compensation     ║");
    println!("╚══════════════════════════════════════════════╝\n");

    let root = MemberId::new("M-ROOT");
    let mut tree = PlacementTree::new();
    tree.insert_root(Member::new("M-ROOT", "You")).unwrap();
    let mut engine = CompensationEngine::new(RankTable::standard(), tree);

    // --- Scenario 1: Building the team ---
    println!("━━━ Scenario 1: Enrollment and spillover ━━━\n");

    engine
        .enroll(Member::new("M-A", "Alice"), &root, Some(Leg::Left))
        .unwrap();
    engine
        .enroll(Member::new("M-B", "Bob"), &root, Some(Leg::Right))
        .unwrap();
    // Two more recruits sponsored by the root: both slots are taken,
    // so they spill over into the downline.
    engine.enroll(Member::new("M-C", "Carol"), &root, None).unwrap();
    engine.enroll(Member::new("M-D", "Dan"), &root, None).unwrap();

    for member in engine.tree().members() {
        println!(
            "{:<6} {:<8} parent={:<8} sponsor={:<8} direct={}",
            member.id(),
            member.name(),
            member.parent().map(|p| p.as_str()).unwrap_or("—"),
            member.sponsor().map(|s| s.as_str()).unwrap_or("—"),
            member.is_direct_recruit(),
        );
    }
    println!();

    // --- Scenario 2: Sales and leg volumes ---
    println!("━━━ Scenario 2: Sales and the pay-leg split ━━━\n");

    engine.record_sale(&MemberId::new("M-A"), dec!(320)).unwrap();
    engine.record_sale(&MemberId::new("M-B"), dec!(548)).unwrap();
    engine.record_sale(&MemberId::new("M-C"), dec!(150)).unwrap();

    let stats = engine.stats(&root).unwrap();
    println!("{}", stats);

    // --- Scenario 3: The bonus ledger ---
    println!("━━━ Scenario 3: Accrued bonuses ━━━\n");

    engine.set_rank(&root, 5).unwrap(); // Influencer, 11% pay-leg rate
    engine.close_period(&root).unwrap();

    for entry in engine.ledger().entries_for(&root) {
        println!("  {:?}: {} — {}", entry.kind(), entry.amount(), entry.description());
    }
    println!(
        "\nTotal earnings: {}",
        engine.ledger().grand_total_for(&root)
    );
}
