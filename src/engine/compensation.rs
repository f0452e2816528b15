use crate::core::ledger::{BonusEntry, BonusKind, BonusLedger, LedgerError};
use crate::core::member::{Leg, Member, MemberId};
use crate::core::rank::{Rank, RankTable};
use crate::engine::bonus::{pay_leg_bonus, progress_percent, BonusSchedule};
use crate::engine::stats::MemberStats;
use crate::tree::placement::{PlacementTree, TreeError};
use crate::tree::sponsorship::{SponsorshipIndex, MAX_GENERATION};
use log::info;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;
use uuid::Uuid;

/// Errors from engine mutations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown member {0}")]
    UnknownMember(MemberId),
    #[error("sale amount must be positive, got {amount} for {member}")]
    NonPositiveSale { member: MemberId, amount: Decimal },
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// The compensation engine: system of record for the rank table, the
/// member tree and the bonus ledger, plus the derived query surface.
///
/// Construct one explicitly and pass it by reference to consumers;
/// there is no ambient singleton. Mutations take `&mut self` and leave
/// one consistent snapshot; queries are pure reads, so concurrent
/// readers behind a lock never observe a half-applied update.
///
/// # Examples
///
/// ```
/// use compensation_engine::prelude::*;
///
/// let mut tree = PlacementTree::new();
/// tree.insert_root(Member::new("M-ROOT", "You")).unwrap();
/// let engine = CompensationEngine::new(RankTable::standard(), tree);
///
/// assert_eq!(engine.rank_name(1), "Visionary");
/// assert_eq!(engine.rank_name(-42), "Visionary"); // fallback, never panics
/// ```
#[derive(Debug, Clone)]
pub struct CompensationEngine {
    ranks: RankTable,
    tree: PlacementTree,
    ledger: BonusLedger,
    schedule: BonusSchedule,
}

impl CompensationEngine {
    pub fn new(ranks: RankTable, tree: PlacementTree) -> Self {
        Self {
            ranks,
            tree,
            ledger: BonusLedger::new(),
            schedule: BonusSchedule::default(),
        }
    }

    pub fn with_schedule(mut self, schedule: BonusSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    // --- Rank queries ---

    /// Rank lookup with fallback to the lowest rank for unknown ids.
    /// Deliberate policy: bad ids degrade, they never abort a query.
    pub fn rank_by_id(&self, id: i64) -> &Rank {
        self.ranks.get(id)
    }

    pub fn rank_name(&self, id: i64) -> &str {
        self.ranks.name(id)
    }

    pub fn rank_color(&self, id: i64) -> &str {
        self.ranks.color(id)
    }

    pub fn ranks(&self) -> &RankTable {
        &self.ranks
    }

    // --- Member queries ---

    /// Lookup by id. Absence (an empty leg slot, a stale reference) is
    /// expected and not an error.
    pub fn member(&self, id: &MemberId) -> Option<&Member> {
        self.tree.member(id)
    }

    /// Placement children of a node; at most two on a well-formed tree.
    pub fn children(&self, id: &MemberId) -> Vec<&Member> {
        self.tree.children(id)
    }

    /// Members personally recruited by the root user, in insertion order.
    pub fn direct_recruits(&self) -> Vec<&Member> {
        self.tree
            .members()
            .iter()
            .filter(|m| m.is_direct_recruit())
            .collect()
    }

    pub fn tree(&self) -> &PlacementTree {
        &self.tree
    }

    pub fn ledger(&self) -> &BonusLedger {
        &self.ledger
    }

    pub fn schedule(&self) -> &BonusSchedule {
        &self.schedule
    }

    /// Build the sponsorship view over the current member set.
    pub fn sponsorship(&self) -> SponsorshipIndex {
        SponsorshipIndex::from_members(self.tree.members())
    }

    // --- Derivations ---

    /// One consistent snapshot of a member's standing, recomputed from
    /// the tree and ledger. `None` for an unknown member.
    pub fn stats(&self, id: &MemberId) -> Option<MemberStats> {
        let member = self.tree.member(id)?;
        let left = self.tree.leg_volume(id, Leg::Left);
        let right = self.tree.leg_volume(id, Leg::Right);
        let group = left + right;

        let rank_id = member.rank_id();
        let next = self.ranks.next(rank_id);
        let progress = match next {
            Some(next_rank) => progress_percent(group, next_rank.group_volume_qualified_2),
            // Terminal rank: nothing left to progress toward.
            None => dec!(100),
        };

        let sponsorship = self.sponsorship();

        let direct = self.ledger.total_for(id, BonusKind::Direct);
        let generation = self.ledger.total_for(id, BonusKind::Generation);
        let pay_leg = self.ledger.total_for(id, BonusKind::PayLeg);
        let career = self.ledger.total_for(id, BonusKind::Career);

        Some(MemberStats {
            member: id.clone(),
            left_leg_volume: left,
            right_leg_volume: right,
            pay_leg_volume: left.min(right),
            power_leg_volume: left.max(right),
            direct_recruit_count: sponsorship.direct_recruits_of(id).len(),
            team_size: self.tree.team_size(id),
            rank_id,
            next_rank_id: next.map(|r| r.id),
            progress_percent: progress,
            direct_bonus_total: direct,
            generation_bonus_total: generation,
            pay_leg_bonus_total: pay_leg,
            career_bonus_total: career,
            total_earnings: direct + generation + pay_leg + career,
        })
    }

    /// Pay-leg commission a member would earn right now:
    /// `min(left, right) × rank.pay_leg_rate`, unrounded.
    pub fn calculate_pay_leg_bonus(&self, id: &MemberId) -> Option<Decimal> {
        let member = self.tree.member(id)?;
        let left = self.tree.leg_volume(id, Leg::Left);
        let right = self.tree.leg_volume(id, Leg::Right);
        let rank = self.ranks.get(i64::from(member.rank_id()));
        Some(pay_leg_bonus(left.min(right), rank))
    }

    /// Progress toward the next rank, clamped to [0, 100].
    pub fn progress_to_next_rank(&self, id: &MemberId) -> Option<Decimal> {
        self.stats(id).map(|s| s.progress_percent)
    }

    /// Whether `id` currently meets the qualification criteria for
    /// `rank`: the group-volume threshold plus the required count of
    /// direct recruits at the qualifying sub-rank, in either the 2-leg
    /// or the 4-leg configuration.
    pub fn qualifies_for(&self, id: &MemberId, rank: &Rank) -> bool {
        let group = self.tree.group_volume(id);
        let sub_rank = rank.id.saturating_sub(1);
        let sponsorship = self.sponsorship();
        let qualified = sponsorship
            .direct_recruits_of(id)
            .iter()
            .filter_map(|r| self.tree.member(r))
            .filter(|m| m.rank_id() >= sub_rank)
            .count();

        (group >= rank.group_volume_qualified_2
            && qualified >= usize::from(rank.required_rank_2))
            || (group >= rank.group_volume_qualified_4
                && qualified >= usize::from(rank.required_rank_4))
    }

    // --- Mutations ---

    /// Install the root member of a fresh tree.
    pub fn enroll_root(&mut self, member: Member) -> Result<(), EngineError> {
        self.tree.insert_root(member)?;
        Ok(())
    }

    /// Enroll a recruit under `sponsor`, spilling over when the
    /// sponsor's slots are full. A recruit sponsored by the root is
    /// marked as a direct recruit.
    ///
    /// Returns the id of the placement parent.
    pub fn enroll(
        &mut self,
        member: Member,
        sponsor: &MemberId,
        preferred: Option<Leg>,
    ) -> Result<MemberId, EngineError> {
        let member_id = member.id().clone();
        let parent = self.tree.place(member, sponsor, preferred)?;
        let is_root_sponsor = self
            .tree
            .root()
            .map(|r| r.id() == sponsor)
            .unwrap_or(false);
        if is_root_sponsor {
            if let Some(m) = self.tree.member_mut(&member_id) {
                m.mark_direct_recruit();
            }
        }
        Ok(parent)
    }

    /// Record a sale: the seller's personal volume grows, and the
    /// seller's sponsor earns the direct-sales bonus on it.
    ///
    /// The amount must be positive; volumes only ever grow.
    pub fn record_sale(&mut self, seller: &MemberId, amount: Decimal) -> Result<(), EngineError> {
        if amount <= Decimal::ZERO {
            return Err(EngineError::NonPositiveSale {
                member: seller.clone(),
                amount,
            });
        }
        self.tree.add_volume(seller, amount)?;
        let sponsor = self
            .tree
            .member(seller)
            .and_then(|m| m.sponsor())
            .cloned();
        if let Some(sponsor) = sponsor {
            let bonus = self.schedule.direct_sales_bonus(amount);
            if bonus > Decimal::ZERO {
                self.ledger.record(BonusEntry::direct(
                    sponsor,
                    seller.clone(),
                    bonus,
                    format!("direct sales bonus on {} sale by {}", amount, seller),
                ))?;
            }
        }
        Ok(())
    }

    /// Close a compensation period for one member: accrue generation
    /// bonuses over five sponsorship generations and the pay-leg
    /// commission at the member's current rank.
    ///
    /// Returns the ids of the recorded ledger entries.
    pub fn close_period(&mut self, id: &MemberId) -> Result<Vec<Uuid>, EngineError> {
        let member = self
            .tree
            .member(id)
            .ok_or_else(|| EngineError::UnknownMember(id.clone()))?;
        let rank = self.ranks.get(i64::from(member.rank_id())).clone();
        let mut recorded = Vec::new();

        // Generation bonuses, keyed on sponsorship depth — not on
        // placement depth, which is a different relation.
        let sponsorship = self.sponsorship();
        let levels = sponsorship.generations_of(id, MAX_GENERATION);
        for (depth, level) in levels.iter().enumerate() {
            let generation = depth as u8 + 1;
            let revenue: Decimal = level
                .iter()
                .filter_map(|m| self.tree.member(m))
                .map(|m| m.personal_volume())
                .sum();
            let bonus = self.schedule.generation_bonus(generation, revenue);
            if bonus > Decimal::ZERO {
                let entry_id = self.ledger.record(BonusEntry::generation_bonus(
                    id.clone(),
                    id.clone(),
                    generation,
                    bonus,
                    format!("generation {} bonus on {} revenue", generation, revenue),
                ))?;
                recorded.push(entry_id);
            }
        }

        // Pay-leg commission on the lower-volume leg.
        let left = self.tree.leg_volume(id, Leg::Left);
        let right = self.tree.leg_volume(id, Leg::Right);
        let commission = pay_leg_bonus(left.min(right), &rank);
        if commission > Decimal::ZERO {
            let entry_id = self.ledger.record(BonusEntry::pay_leg(
                id.clone(),
                commission,
                format!(
                    "pay leg commission: {} volume at {} rate",
                    left.min(right),
                    rank.pay_leg_rate
                ),
            ))?;
            recorded.push(entry_id);
        }

        Ok(recorded)
    }

    /// Attempt a single-step promotion.
    ///
    /// Moves the member up exactly one rank when the qualification
    /// criteria for the next rank are met, and pays the career bonus
    /// the first time that rank is reached. Re-qualifying after a
    /// demotion never re-triggers the payout.
    ///
    /// Returns the new rank id, or `None` when the member is at the
    /// terminal rank or does not qualify.
    pub fn promote(&mut self, id: &MemberId) -> Result<Option<u8>, EngineError> {
        let member = self
            .tree
            .member(id)
            .ok_or_else(|| EngineError::UnknownMember(id.clone()))?;
        let next = match self.ranks.next(member.rank_id()) {
            Some(rank) => rank.clone(),
            None => return Ok(None),
        };
        if !self.qualifies_for(id, &next) {
            return Ok(None);
        }

        self.tree.set_rank(id, next.id)?;
        info!("{} promoted to rank {} ({})", id, next.id, next.name);

        if next.one_time_payout > Decimal::ZERO && !self.ledger.career_paid(id, next.id) {
            self.ledger.record(BonusEntry::career(
                id.clone(),
                next.id,
                next.one_time_payout,
                format!("career bonus: first time reaching {}", next.name),
            ))?;
        }
        Ok(Some(next.id))
    }

    /// Set a member's rank directly, bypassing qualification.
    ///
    /// For seeding imported networks and administrative corrections;
    /// pays no career bonus. Organic progression goes through
    /// [`promote`](CompensationEngine::promote).
    pub fn set_rank(&mut self, id: &MemberId, rank_id: u8) -> Result<(), EngineError> {
        self.tree.set_rank(id, rank_id)?;
        Ok(())
    }

    /// Drop a member one rank (period re-qualification failed).
    /// Already-paid career bonuses are unaffected.
    pub fn demote(&mut self, id: &MemberId) -> Result<Option<u8>, EngineError> {
        let member = self
            .tree
            .member(id)
            .ok_or_else(|| EngineError::UnknownMember(id.clone()))?;
        let current = member.rank_id();
        if current <= 1 {
            return Ok(None);
        }
        let demoted = current - 1;
        self.tree.set_rank(id, demoted)?;
        info!("{} demoted to rank {}", id, demoted);
        Ok(Some(demoted))
    }

    /// Validate the placement tree's structural integrity.
    pub fn validate(&self) -> Result<(), TreeError> {
        self.tree.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> MemberId {
        MemberId::new(s)
    }

    /// Root with two direct recruits; Alice has two recruits of her own,
    /// one of them spilled under Bob's placement line.
    fn sample_engine() -> CompensationEngine {
        let mut tree = PlacementTree::new();
        tree.insert_root(Member::new("ROOT", "You")).unwrap();
        let mut engine = CompensationEngine::new(RankTable::standard(), tree);
        engine
            .enroll(Member::new("A", "Alice"), &id("ROOT"), Some(Leg::Left))
            .unwrap();
        engine
            .enroll(Member::new("B", "Bob"), &id("ROOT"), Some(Leg::Right))
            .unwrap();
        engine
            .enroll(Member::new("C", "Carol"), &id("A"), Some(Leg::Left))
            .unwrap();
        engine
            .enroll(Member::new("D", "Dan"), &id("A"), Some(Leg::Right))
            .unwrap();
        engine
    }

    #[test]
    fn test_rank_fallback_policy() {
        let engine = sample_engine();
        assert_eq!(engine.rank_by_id(5).name, "Influencer");
        assert_eq!(engine.rank_by_id(0).id, 1);
        assert_eq!(engine.rank_by_id(-1).id, 1);
        assert_eq!(engine.rank_by_id(1_000_000).id, 1);
        assert_eq!(engine.rank_name(i64::MIN), "Visionary");
        assert_eq!(engine.rank_color(i64::MAX), "#9CA3AF");
    }

    #[test]
    fn test_direct_recruits_root_sponsored_only() {
        let engine = sample_engine();
        let recruits = engine.direct_recruits();
        let ids: Vec<&str> = recruits.iter().map(|m| m.id().as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);

        // Idempotent: same set, same order, absent mutation.
        let again: Vec<&str> = engine
            .direct_recruits()
            .iter()
            .map(|m| m.id().as_str())
            .collect();
        assert_eq!(ids, again);
    }

    #[test]
    fn test_stats_pay_power_split() {
        let mut engine = sample_engine();
        engine.record_sale(&id("C"), dec!(300)).unwrap();
        engine.record_sale(&id("D"), dec!(100)).unwrap();
        engine.record_sale(&id("B"), dec!(548)).unwrap();

        let stats = engine.stats(&id("ROOT")).unwrap();
        assert_eq!(stats.left_leg_volume, dec!(400));
        assert_eq!(stats.right_leg_volume, dec!(548));
        assert_eq!(stats.pay_leg_volume, dec!(400));
        assert_eq!(stats.power_leg_volume, dec!(548));
        assert!(stats.is_consistent());
        assert_eq!(stats.team_size, 4);
        assert_eq!(stats.direct_recruit_count, 2);
    }

    #[test]
    fn test_pay_leg_bonus_worked_example() {
        let mut engine = sample_engine();
        // Influencer (rank 5) pays 11% on the pay leg.
        engine.tree.set_rank(&id("ROOT"), 5).unwrap();
        engine.record_sale(&id("A"), dec!(548)).unwrap();
        engine.record_sale(&id("B"), dec!(900)).unwrap();

        assert_eq!(
            engine.calculate_pay_leg_bonus(&id("ROOT")),
            Some(dec!(60.28))
        );
    }

    #[test]
    fn test_record_sale_pays_sponsor() {
        let mut engine = sample_engine();
        engine.record_sale(&id("C"), dec!(500)).unwrap();

        // Carol's sponsor is Alice: 8% of 500.
        assert_eq!(
            engine.ledger().total_for(&id("A"), BonusKind::Direct),
            dec!(40)
        );
        assert_eq!(
            engine.ledger().total_for(&id("ROOT"), BonusKind::Direct),
            dec!(0)
        );
    }

    #[test]
    fn test_record_sale_rejects_non_positive_amount() {
        let mut engine = sample_engine();
        assert!(matches!(
            engine.record_sale(&id("A"), dec!(0)),
            Err(EngineError::NonPositiveSale { .. })
        ));
        assert!(matches!(
            engine.record_sale(&id("A"), dec!(-50)),
            Err(EngineError::NonPositiveSale { .. })
        ));

        // Nothing moved: no volume, no bonus.
        assert_eq!(
            engine.member(&id("A")).unwrap().personal_volume(),
            Decimal::ZERO
        );
        assert!(engine.ledger().is_empty());
    }

    #[test]
    fn test_root_sale_earns_nobody_a_direct_bonus() {
        let mut engine = sample_engine();
        engine.record_sale(&id("ROOT"), dec!(500)).unwrap();
        assert_eq!(engine.ledger().total(BonusKind::Direct), dec!(0));
    }

    #[test]
    fn test_close_period_generation_depth_is_sponsorship() {
        let mut engine = sample_engine();
        // Eve is sponsored by Carol but spills into the placement tree
        // wherever there is room; her generation under ROOT is 3
        // (ROOT → A → C → E in the sponsorship chain).
        engine
            .enroll(Member::new("E", "Eve"), &id("C"), None)
            .unwrap();
        engine.record_sale(&id("E"), dec!(1000)).unwrap();

        engine.close_period(&id("ROOT")).unwrap();
        let entries = engine.ledger().entries_for(&id("ROOT"));
        let gen3: Vec<_> = entries
            .iter()
            .filter(|e| e.generation() == Some(3))
            .collect();
        assert_eq!(gen3.len(), 1);
        // 1% of 1000.
        assert_eq!(gen3[0].amount(), dec!(10));
    }

    #[test]
    fn test_close_period_pay_leg_commission() {
        let mut engine = sample_engine();
        engine.tree.set_rank(&id("ROOT"), 5).unwrap();
        engine.record_sale(&id("A"), dec!(548)).unwrap();
        engine.record_sale(&id("B"), dec!(900)).unwrap();

        engine.close_period(&id("ROOT")).unwrap();
        assert_eq!(
            engine.ledger().total_for(&id("ROOT"), BonusKind::PayLeg),
            dec!(60.28)
        );
    }

    #[test]
    fn test_promote_single_step_and_career_once() {
        let mut engine = sample_engine();
        // Pioneer (rank 2): 1000 group volume, two direct recruits at
        // the qualifying sub-rank.
        engine.record_sale(&id("A"), dec!(600)).unwrap();
        engine.record_sale(&id("B"), dec!(600)).unwrap();

        assert_eq!(engine.promote(&id("ROOT")).unwrap(), Some(2));
        assert_eq!(engine.member(&id("ROOT")).unwrap().rank_id(), 2);
        assert_eq!(engine.ledger().total(BonusKind::Career), dec!(50));

        // Drop and re-qualify: the rank comes back, the payout does not.
        assert_eq!(engine.demote(&id("ROOT")).unwrap(), Some(1));
        assert_eq!(engine.promote(&id("ROOT")).unwrap(), Some(2));
        assert_eq!(engine.ledger().total(BonusKind::Career), dec!(50));

        let career_entries: usize = engine
            .ledger()
            .entries()
            .iter()
            .filter(|e| e.kind() == BonusKind::Career && e.rank_id() == Some(2))
            .count();
        assert_eq!(career_entries, 1);
    }

    #[test]
    fn test_promote_requires_qualification() {
        let mut engine = sample_engine();
        // No volume at all: rank 2 needs 1000 group volume.
        assert_eq!(engine.promote(&id("ROOT")).unwrap(), None);
        assert_eq!(engine.member(&id("ROOT")).unwrap().rank_id(), 1);
        assert!(engine.ledger().is_empty());
    }

    #[test]
    fn test_promote_terminal_rank_is_none() {
        let mut engine = sample_engine();
        engine.tree.set_rank(&id("ROOT"), 11).unwrap();
        assert_eq!(engine.promote(&id("ROOT")).unwrap(), None);
    }

    #[test]
    fn test_demote_floors_at_entry_rank() {
        let mut engine = sample_engine();
        assert_eq!(engine.demote(&id("ROOT")).unwrap(), None);
        assert_eq!(engine.member(&id("ROOT")).unwrap().rank_id(), 1);
    }

    #[test]
    fn test_progress_clamped_and_terminal() {
        let mut engine = sample_engine();
        engine.record_sale(&id("A"), dec!(5_000)).unwrap();

        // 5000 toward rank 2's 1000 threshold: clamped to 100.
        assert_eq!(engine.progress_to_next_rank(&id("ROOT")), Some(dec!(100)));

        engine.tree.set_rank(&id("ROOT"), 11).unwrap();
        assert_eq!(engine.progress_to_next_rank(&id("ROOT")), Some(dec!(100)));

        assert_eq!(engine.progress_to_next_rank(&id("NOBODY")), None);
    }

    #[test]
    fn test_unknown_member_surfaces() {
        let mut engine = sample_engine();
        assert!(engine.stats(&id("NOBODY")).is_none());
        assert!(engine.calculate_pay_leg_bonus(&id("NOBODY")).is_none());
        assert!(matches!(
            engine.close_period(&id("NOBODY")),
            Err(EngineError::UnknownMember(_))
        ));
        assert!(matches!(
            engine.promote(&id("NOBODY")),
            Err(EngineError::UnknownMember(_))
        ));
    }
}
