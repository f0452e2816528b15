use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One tier in the 11-step career ladder.
///
/// Ranks are static reference data: defined once when the engine is
/// constructed and immutable for the life of the process. They are
/// totally ordered by `id`, and every numeric requirement is
/// non-decreasing in `id`.
///
/// # Examples
///
/// ```
/// use compensation_engine::core::rank::RankTable;
///
/// let ranks = RankTable::standard();
/// assert_eq!(ranks.get(1).name, "Visionary");
/// assert_eq!(ranks.get(11).name, "Mastermind");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rank {
    /// Ladder position, 1 (entry) through 11 (terminal).
    pub id: u8,
    /// Display name.
    pub name: String,
    /// Display color (hex), used by dashboard consumers.
    pub color: String,
    /// Group volume required to qualify with a 2-leg-qualified downline.
    pub group_volume_qualified_2: Decimal,
    /// Group volume required to qualify with a 4-leg-qualified downline.
    /// Lower than the 2-leg threshold: more qualified lines, less volume.
    pub group_volume_qualified_4: Decimal,
    /// Career bonus owed the first time this rank is reached.
    pub one_time_payout: Decimal,
    /// Commission rate applied to the pay leg volume.
    pub pay_leg_rate: Decimal,
    /// Minimum count of downline members at the qualifying sub-rank
    /// in the 2-leg configuration.
    pub required_rank_2: u8,
    /// Same count for the 4-leg configuration.
    pub required_rank_4: u8,
}

impl Rank {
    /// Returns true if this is the terminal rank (no higher transition).
    pub fn is_terminal(&self, table: &RankTable) -> bool {
        table.next(self.id).is_none()
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.id, self.name)
    }
}

/// The ordered rank ladder.
///
/// Lookups never fail: an unknown id falls back to the lowest rank.
/// This is a deliberate policy, not broken error handling — rank ids
/// arrive from member records and dashboard inputs, and a bad id must
/// degrade to the entry rank rather than abort a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankTable {
    ranks: Vec<Rank>,
}

impl RankTable {
    /// Build the standard 11-rank Matwix ladder.
    pub fn standard() -> Self {
        let rank = |id: u8,
                    name: &str,
                    color: &str,
                    gv2: Decimal,
                    gv4: Decimal,
                    payout: Decimal,
                    rate: Decimal,
                    req2: u8,
                    req4: u8| Rank {
            id,
            name: name.to_string(),
            color: color.to_string(),
            group_volume_qualified_2: gv2,
            group_volume_qualified_4: gv4,
            one_time_payout: payout,
            pay_leg_rate: rate,
            required_rank_2: req2,
            required_rank_4: req4,
        };

        Self {
            ranks: vec![
                rank(1, "Visionary", "#9CA3AF", dec!(0), dec!(0), dec!(0), dec!(0.00), 0, 0),
                rank(2, "Pioneer", "#22C55E", dec!(1_000), dec!(800), dec!(50), dec!(0.05), 2, 4),
                rank(3, "Mentor", "#10B981", dec!(3_000), dec!(2_400), dec!(150), dec!(0.07), 2, 4),
                rank(4, "Strategist", "#06B6D4", dec!(7_000), dec!(5_600), dec!(400), dec!(0.09), 2, 4),
                rank(5, "Influencer", "#3B82F6", dec!(15_000), dec!(12_000), dec!(1_000), dec!(0.11), 2, 4),
                rank(6, "Director", "#6366F1", dec!(30_000), dec!(24_000), dec!(2_500), dec!(0.14), 2, 4),
                rank(7, "Executive", "#8B5CF6", dec!(60_000), dec!(48_000), dec!(5_000), dec!(0.17), 2, 4),
                rank(8, "Ambassador", "#A855F7", dec!(120_000), dec!(96_000), dec!(10_000), dec!(0.20), 2, 4),
                rank(9, "President", "#EC4899", dec!(250_000), dec!(200_000), dec!(25_000), dec!(0.24), 2, 4),
                rank(10, "Crown", "#F59E0B", dec!(500_000), dec!(400_000), dec!(60_000), dec!(0.28), 2, 4),
                rank(11, "Mastermind", "#EF4444", dec!(1_000_000), dec!(800_000), dec!(150_000), dec!(0.32), 2, 4),
            ],
        }
    }

    /// Look up a rank by id, falling back to the lowest rank for any
    /// unknown id (including zero and negative values). Never panics.
    pub fn get(&self, id: i64) -> &Rank {
        self.ranks
            .iter()
            .find(|r| i64::from(r.id) == id)
            .unwrap_or(&self.ranks[0])
    }

    /// Display name for a rank id, with the same fallback policy as [`get`].
    ///
    /// [`get`]: RankTable::get
    pub fn name(&self, id: i64) -> &str {
        &self.get(id).name
    }

    /// Display color for a rank id, with the same fallback policy as [`get`].
    ///
    /// [`get`]: RankTable::get
    pub fn color(&self, id: i64) -> &str {
        &self.get(id).color
    }

    /// The next rank above `id`, or `None` at the top of the ladder
    /// (or for unknown ids above it).
    pub fn next(&self, id: u8) -> Option<&Rank> {
        let next_id = id.checked_add(1)?;
        self.ranks.iter().find(|r| r.id == next_id)
    }

    /// All ranks in ladder order.
    pub fn iter(&self) -> impl Iterator<Item = &Rank> {
        self.ranks.iter()
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// The lowest (default/entry) rank.
    pub fn lowest(&self) -> &Rank {
        &self.ranks[0]
    }

    /// The terminal rank.
    pub fn highest(&self) -> &Rank {
        &self.ranks[self.ranks.len() - 1]
    }
}

impl Default for RankTable {
    fn default() -> Self {
        Self::standard()
    }
}
