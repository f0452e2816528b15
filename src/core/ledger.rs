use crate::core::member::MemberId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

/// The four bonus types of the compensation plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BonusKind {
    /// 8% of a sale made by a directly-recruited member.
    Direct,
    /// Percentage of revenue at a given sponsorship generation (1-5).
    Generation,
    /// Pay-leg volume times the member's rank commission rate.
    PayLeg,
    /// One-time payout on first attainment of a rank.
    Career,
}

/// Errors arising from ledger mutations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("bonus amount must be positive, got {amount} for {member}")]
    NonPositiveAmount { member: MemberId, amount: Decimal },
    #[error("career bonus for rank {rank_id} already paid to {member}")]
    CareerAlreadyPaid { member: MemberId, rank_id: u8 },
}

/// A record of one bonus payment event.
///
/// Entries are immutable once recorded. Amounts are rounded to the
/// currency's minor unit (cents) at recording time; intermediate
/// calculations stay unrounded.
///
/// `generation` is present if and only if the kind is [`BonusKind::Generation`];
/// `rank_id` is present if and only if the kind is [`BonusKind::Career`].
/// Both invariants hold by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusEntry {
    id: Uuid,
    kind: BonusKind,
    amount: Decimal,
    /// Who earned the bonus.
    member: MemberId,
    /// Whose activity produced it (the seller, the promoted member, etc.).
    source: MemberId,
    description: String,
    date: DateTime<Utc>,
    /// Sponsorship generation (1-5). Generation bonuses only.
    #[serde(skip_serializing_if = "Option::is_none")]
    generation: Option<u8>,
    /// Rank attained. Career bonuses only.
    #[serde(skip_serializing_if = "Option::is_none")]
    rank_id: Option<u8>,
}

impl BonusEntry {
    fn record(
        kind: BonusKind,
        member: MemberId,
        source: MemberId,
        amount: Decimal,
        description: impl Into<String>,
        generation: Option<u8>,
        rank_id: Option<u8>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            // Round to cents at the point of payment recording.
            amount: amount.round_dp(2),
            member,
            source,
            description: description.into(),
            date: Utc::now(),
            generation,
            rank_id,
        }
    }

    /// A direct-sales bonus earned from a sale by `source`.
    pub fn direct(
        member: MemberId,
        source: MemberId,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Self {
        Self::record(BonusKind::Direct, member, source, amount, description, None, None)
    }

    /// A generation bonus earned at sponsorship depth `generation` (1-5).
    ///
    /// # Panics
    ///
    /// Panics if `generation` is outside 1-5.
    pub fn generation_bonus(
        member: MemberId,
        source: MemberId,
        generation: u8,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Self {
        assert!(
            (1..=5).contains(&generation),
            "generation must be 1-5, got {}",
            generation
        );
        Self::record(
            BonusKind::Generation,
            member,
            source,
            amount,
            description,
            Some(generation),
            None,
        )
    }

    /// A pay-leg commission for `member`.
    pub fn pay_leg(member: MemberId, amount: Decimal, description: impl Into<String>) -> Self {
        let source = member.clone();
        Self::record(BonusKind::PayLeg, member, source, amount, description, None, None)
    }

    /// A one-time career bonus for attaining `rank_id`.
    pub fn career(
        member: MemberId,
        rank_id: u8,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Self {
        let source = member.clone();
        Self::record(
            BonusKind::Career,
            member,
            source,
            amount,
            description,
            None,
            Some(rank_id),
        )
    }

    // --- Accessors ---

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> BonusKind {
        self.kind
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn member(&self) -> &MemberId {
        &self.member
    }

    pub fn source(&self) -> &MemberId {
        &self.source
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn generation(&self) -> Option<u8> {
        self.generation
    }

    pub fn rank_id(&self) -> Option<u8> {
        self.rank_id
    }
}

/// Append-only log of bonus payments.
///
/// Besides the entries themselves, the ledger tracks which
/// (member, rank) career bonuses have already been paid, so a member
/// who drops a rank and re-qualifies is never paid twice for it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BonusLedger {
    entries: Vec<BonusEntry>,
    career_paid: HashSet<(MemberId, u8)>,
}

impl BonusLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    ///
    /// Rejects non-positive amounts, and rejects a career bonus whose
    /// (member, rank) pair was already paid.
    pub fn record(&mut self, entry: BonusEntry) -> Result<Uuid, LedgerError> {
        if entry.amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount {
                member: entry.member.clone(),
                amount: entry.amount,
            });
        }
        if entry.kind == BonusKind::Career {
            // rank_id is Some by construction for career entries
            let rank_id = entry.rank_id.unwrap_or(0);
            let key = (entry.member.clone(), rank_id);
            if self.career_paid.contains(&key) {
                return Err(LedgerError::CareerAlreadyPaid {
                    member: entry.member.clone(),
                    rank_id,
                });
            }
            self.career_paid.insert(key);
        }
        let id = entry.id;
        self.entries.push(entry);
        Ok(id)
    }

    /// Whether a career bonus for (member, rank) has already been paid.
    pub fn career_paid(&self, member: &MemberId, rank_id: u8) -> bool {
        self.career_paid.contains(&(member.clone(), rank_id))
    }

    /// All entries, in recording order.
    pub fn entries(&self) -> &[BonusEntry] {
        &self.entries
    }

    /// Entries earned by one member, in recording order.
    pub fn entries_for(&self, member: &MemberId) -> Vec<&BonusEntry> {
        self.entries.iter().filter(|e| &e.member == member).collect()
    }

    /// Sum of all amounts of one kind across the whole ledger.
    pub fn total(&self, kind: BonusKind) -> Decimal {
        self.entries
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.amount)
            .sum()
    }

    /// Sum of one member's earnings of one kind.
    pub fn total_for(&self, member: &MemberId, kind: BonusKind) -> Decimal {
        self.entries
            .iter()
            .filter(|e| &e.member == member && e.kind == kind)
            .map(|e| e.amount)
            .sum()
    }

    /// One member's earnings across all kinds.
    pub fn grand_total_for(&self, member: &MemberId) -> Decimal {
        self.entries
            .iter()
            .filter(|e| &e.member == member)
            .map(|e| e.amount)
            .sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
