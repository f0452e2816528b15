use crate::core::member::MemberId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A derived snapshot of one member's standing.
///
/// This is a view over the placement tree and the bonus ledger, never
/// a source of truth: it is recomputed whenever asked for, so the
/// pay/power split always reflects the current leg volumes.
///
/// Invariant: `pay_leg_volume <= power_leg_volume`, and the two equal
/// `{left_leg_volume, right_leg_volume}` as a set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberStats {
    pub member: MemberId,
    pub left_leg_volume: Decimal,
    pub right_leg_volume: Decimal,
    /// The lower-volume leg. Commissions are paid on this one.
    pub pay_leg_volume: Decimal,
    /// The higher-volume leg.
    pub power_leg_volume: Decimal,
    pub direct_recruit_count: usize,
    pub team_size: usize,
    pub rank_id: u8,
    /// `None` at the terminal rank.
    pub next_rank_id: Option<u8>,
    /// Progress toward the next rank's 2-leg volume threshold,
    /// clamped to [0, 100]. 100 at the terminal rank.
    pub progress_percent: Decimal,
    pub direct_bonus_total: Decimal,
    pub generation_bonus_total: Decimal,
    pub pay_leg_bonus_total: Decimal,
    pub career_bonus_total: Decimal,
    pub total_earnings: Decimal,
}

impl MemberStats {
    /// Group volume: both legs combined.
    pub fn group_volume(&self) -> Decimal {
        self.left_leg_volume + self.right_leg_volume
    }

    /// Check the pay/power invariant of this snapshot.
    pub fn is_consistent(&self) -> bool {
        self.pay_leg_volume <= self.power_leg_volume
            && self.pay_leg_volume == self.left_leg_volume.min(self.right_leg_volume)
            && self.power_leg_volume == self.left_leg_volume.max(self.right_leg_volume)
            && self.total_earnings
                == self.direct_bonus_total
                    + self.generation_bonus_total
                    + self.pay_leg_bonus_total
                    + self.career_bonus_total
    }

    /// Progress as an `f64` for display consumers.
    pub fn progress_percent_f64(&self) -> f64 {
        self.progress_percent.to_string().parse::<f64>().unwrap_or(0.0)
    }
}

impl fmt::Display for MemberStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Stats: {} ===", self.member)?;
        writeln!(f, "Left leg:       {}", self.left_leg_volume)?;
        writeln!(f, "Right leg:      {}", self.right_leg_volume)?;
        writeln!(f, "Pay leg:        {}", self.pay_leg_volume)?;
        writeln!(f, "Power leg:      {}", self.power_leg_volume)?;
        writeln!(f, "Group volume:   {}", self.group_volume())?;
        writeln!(f, "Direct recruits:{}", self.direct_recruit_count)?;
        writeln!(f, "Team size:      {}", self.team_size)?;
        writeln!(f, "Rank:           {}", self.rank_id)?;
        match self.next_rank_id {
            Some(next) => writeln!(
                f,
                "Next rank:      {} ({:.1}% there)",
                next,
                self.progress_percent_f64()
            )?,
            None => writeln!(f, "Next rank:      — (terminal)")?,
        }
        writeln!(f, "Direct bonus:   {}", self.direct_bonus_total)?;
        writeln!(f, "Generation:     {}", self.generation_bonus_total)?;
        writeln!(f, "Pay-leg bonus:  {}", self.pay_leg_bonus_total)?;
        writeln!(f, "Career bonus:   {}", self.career_bonus_total)?;
        writeln!(f, "Total earnings: {}", self.total_earnings)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rust_decimal_macros::dec;

    fn snapshot(left: Decimal, right: Decimal) -> MemberStats {
        MemberStats {
            member: MemberId::new("M-TEST"),
            left_leg_volume: left,
            right_leg_volume: right,
            pay_leg_volume: left.min(right),
            power_leg_volume: left.max(right),
            direct_recruit_count: 0,
            team_size: 0,
            rank_id: 1,
            next_rank_id: Some(2),
            progress_percent: dec!(42.5),
            direct_bonus_total: dec!(10),
            generation_bonus_total: dec!(5),
            pay_leg_bonus_total: dec!(20),
            career_bonus_total: dec!(50),
            total_earnings: dec!(85),
        }
    }

    #[test]
    fn test_consistency_check() {
        assert!(snapshot(dec!(300), dec!(548)).is_consistent());
        assert!(snapshot(dec!(548), dec!(300)).is_consistent());
        assert!(snapshot(dec!(0), dec!(0)).is_consistent());

        let mut broken = snapshot(dec!(300), dec!(548));
        broken.pay_leg_volume = dec!(548);
        broken.power_leg_volume = dec!(300);
        assert!(!broken.is_consistent());
    }

    #[test]
    fn test_group_volume() {
        assert_eq!(snapshot(dec!(300), dec!(548)).group_volume(), dec!(848));
    }

    #[test]
    fn test_progress_percent_f64() {
        let stats = snapshot(dec!(1), dec!(2));
        assert_relative_eq!(stats.progress_percent_f64(), 42.5, epsilon = 1e-9);
    }
}
