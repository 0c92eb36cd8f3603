//! Per-faction money.
//!
//! Income is paid in whole-second steps: after `N` simulated seconds a purse
//! has received `floor(N) * income_per_second`. The fractional remainder is
//! carried between ticks, so the payout does not depend on tick size.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed};

/// A faction's money and income.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Purse {
    /// Current money.
    pub money: i32,
    /// Money added per whole simulated second.
    pub income_per_second: i32,
    /// Simulated time accumulated toward the next payout.
    #[serde(with = "fixed_serde")]
    carry: Fixed,
}

impl Purse {
    /// Create a purse with starting money and an income rate.
    #[must_use]
    pub const fn new(money: i32, income_per_second: i32) -> Self {
        Self {
            money,
            income_per_second,
            carry: Fixed::ZERO,
        }
    }

    /// Advance by `dt` simulated seconds, paying income for each whole
    /// second crossed.
    ///
    /// Returns the amount paid out.
    pub fn advance(&mut self, dt: Fixed) -> i32 {
        if dt <= Fixed::ZERO {
            return 0;
        }
        self.carry += dt;
        let whole_seconds = self.carry.int();
        self.carry -= whole_seconds;
        let payout = self
            .income_per_second
            .saturating_mul(whole_seconds.to_num::<i32>());
        self.money = self.money.saturating_add(payout);
        payout
    }

    /// Check if the purse covers a cost.
    #[must_use]
    pub const fn can_afford(&self, cost: i32) -> bool {
        self.money >= cost
    }

    /// Spend money if available.
    ///
    /// Returns true if the transaction succeeded.
    pub fn spend(&mut self, amount: i32) -> bool {
        if self.can_afford(amount) {
            self.money -= amount;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_income_per_whole_second() {
        let mut purse = Purse::new(0, 50);
        for _ in 0..12 {
            purse.advance(Fixed::from_num(0.25));
        }
        assert_eq!(purse.money, 150);
    }

    #[test]
    fn test_partial_second_pays_nothing() {
        let mut purse = Purse::new(10, 50);
        assert_eq!(purse.advance(Fixed::from_num(0.75)), 0);
        assert_eq!(purse.money, 10);
        assert_eq!(purse.advance(Fixed::from_num(0.25)), 50);
        assert_eq!(purse.money, 60);
    }

    #[test]
    fn test_large_step_pays_floor() {
        let mut purse = Purse::new(0, 50);
        assert_eq!(purse.advance(Fixed::from_num(2.5)), 100);
        assert_eq!(purse.advance(Fixed::from_num(0.5)), 50);
    }

    #[test]
    fn test_spend() {
        let mut purse = Purse::new(50, 0);
        assert!(!purse.spend(75));
        assert_eq!(purse.money, 50);
        assert!(purse.spend(50));
        assert_eq!(purse.money, 0);
    }
}
