use crate::core::rank::Rank;
use crate::tree::sponsorship::MAX_GENERATION;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// The commission rates of the compensation plan.
///
/// All rates are fractions (0.08 = 8%). The pay-leg rate is not here:
/// it varies by rank and lives on [`Rank`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusSchedule {
    /// Rate applied to a sale made by a directly-recruited member.
    pub direct_sales_rate: Decimal,
    /// Rates for sponsorship generations 1 through 5, in order.
    pub generation_rates: [Decimal; MAX_GENERATION as usize],
}

impl Default for BonusSchedule {
    fn default() -> Self {
        Self {
            direct_sales_rate: dec!(0.08),
            generation_rates: [dec!(0.08), dec!(0.02), dec!(0.01), dec!(0.01), dec!(0.005)],
        }
    }
}

impl BonusSchedule {
    /// Rate for a sponsorship generation, zero outside 1-5.
    pub fn generation_rate(&self, generation: u8) -> Decimal {
        if (1..=MAX_GENERATION).contains(&generation) {
            self.generation_rates[usize::from(generation) - 1]
        } else {
            Decimal::ZERO
        }
    }

    /// Direct-sales bonus on one sale.
    pub fn direct_sales_bonus(&self, sale_volume: Decimal) -> Decimal {
        sale_volume * self.direct_sales_rate
    }

    /// Generation bonus on revenue at a given sponsorship depth.
    pub fn generation_bonus(&self, generation: u8, revenue: Decimal) -> Decimal {
        revenue * self.generation_rate(generation)
    }
}

/// Pay-leg commission: the central monetized rule of the plan.
///
/// The pay leg is the lower-volume leg; paying on it rewards balanced
/// growth. No rounding happens here — amounts are rounded to cents only
/// when recorded into the ledger.
pub fn pay_leg_bonus(pay_leg_volume: Decimal, rank: &Rank) -> Decimal {
    pay_leg_volume * rank.pay_leg_rate
}

/// Progress toward `threshold` as a percentage, clamped to [0, 100].
///
/// A zero threshold (only the entry rank, which is never a promotion
/// target) yields 0 rather than a division by zero.
pub fn progress_percent(current_volume: Decimal, threshold: Decimal) -> Decimal {
    if threshold <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let pct = current_volume * dec!(100) / threshold;
    pct.clamp(Decimal::ZERO, dec!(100))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rank::RankTable;

    #[test]
    fn test_default_schedule_rates() {
        let schedule = BonusSchedule::default();
        assert_eq!(schedule.direct_sales_rate, dec!(0.08));
        assert_eq!(schedule.generation_rate(1), dec!(0.08));
        assert_eq!(schedule.generation_rate(2), dec!(0.02));
        assert_eq!(schedule.generation_rate(5), dec!(0.005));
        assert_eq!(schedule.generation_rate(0), Decimal::ZERO);
        assert_eq!(schedule.generation_rate(6), Decimal::ZERO);
    }

    #[test]
    fn test_direct_sales_bonus() {
        let schedule = BonusSchedule::default();
        assert_eq!(schedule.direct_sales_bonus(dec!(500)), dec!(40));
    }

    #[test]
    fn test_generation_bonus() {
        let schedule = BonusSchedule::default();
        assert_eq!(schedule.generation_bonus(2, dec!(1000)), dec!(20));
        assert_eq!(schedule.generation_bonus(5, dec!(1000)), dec!(5));
        assert_eq!(schedule.generation_bonus(9, dec!(1000)), Decimal::ZERO);
    }

    #[test]
    fn test_pay_leg_bonus_worked_example() {
        // 548 at 11% = 60.28, the documented reference case.
        let ranks = RankTable::standard();
        let influencer = ranks
            .iter()
            .find(|r| r.pay_leg_rate == dec!(0.11))
            .expect("ladder has an 11% rank");
        assert_eq!(pay_leg_bonus(dec!(548), influencer), dec!(60.28));
    }

    #[test]
    fn test_pay_leg_bonus_zero_at_entry_rank() {
        let ranks = RankTable::standard();
        assert_eq!(pay_leg_bonus(dec!(548), ranks.lowest()), Decimal::ZERO);
    }

    #[test]
    fn test_progress_percent_clamped() {
        assert_eq!(progress_percent(dec!(500), dec!(1000)), dec!(50));
        assert_eq!(progress_percent(dec!(2500), dec!(1000)), dec!(100));
        assert_eq!(progress_percent(dec!(0), dec!(1000)), dec!(0));
    }

    #[test]
    fn test_progress_percent_zero_threshold_guard() {
        assert_eq!(progress_percent(dec!(500), dec!(0)), Decimal::ZERO);
        assert_eq!(progress_percent(dec!(500), dec!(-1)), Decimal::ZERO);
    }
}
