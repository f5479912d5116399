//! Balances and ledger posting actions
//!
//! Balance math is all Decimal; the posting action is a closed enum so an
//! invalid action is a compile-time error rather than a runtime string
//! mismatch.

use crate::errors::AccountError;
use crate::ids::Currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ledger posting actions applied to a balance.
///
/// `Credit`/`Debit` move the long cash leg; `ShortCredit`/`ShortDebit`
/// move the short-proceeds leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostingAction {
    Credit,
    Debit,
    ShortCredit,
    ShortDebit,
}

/// Cash balance in a single currency.
///
/// Invariant: total = available + locked, on both the long and short legs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub currency: Currency,
    pub total: Decimal,
    pub available: Decimal,
    pub locked: Decimal,
    /// Proceeds held against open short positions.
    pub short_proceeds: Decimal,
}

impl Balance {
    /// Create a new balance with everything available.
    pub fn new(currency: Currency, total: Decimal) -> Self {
        Self {
            currency,
            total,
            available: total,
            locked: Decimal::ZERO,
            short_proceeds: Decimal::ZERO,
        }
    }

    /// Check balance invariant: total = available + locked.
    pub fn check_invariant(&self) -> bool {
        self.total == self.available + self.locked
    }

    /// Apply a ledger posting.
    pub fn post(&mut self, action: PostingAction, amount: Decimal) -> Result<(), AccountError> {
        if amount < Decimal::ZERO {
            return Err(AccountError::NegativeAmount {
                amount: amount.to_string(),
            });
        }
        match action {
            PostingAction::Credit => {
                self.available += amount;
                self.total += amount;
            }
            PostingAction::Debit => {
                if amount > self.available {
                    return Err(AccountError::InsufficientBalance {
                        currency: self.currency.to_string(),
                        required: amount.to_string(),
                        available: self.available.to_string(),
                    });
                }
                self.available -= amount;
                self.total -= amount;
            }
            PostingAction::ShortCredit => {
                self.short_proceeds += amount;
            }
            PostingAction::ShortDebit => {
                if amount > self.short_proceeds {
                    return Err(AccountError::InsufficientBalance {
                        currency: self.currency.to_string(),
                        required: amount.to_string(),
                        available: self.short_proceeds.to_string(),
                    });
                }
                self.short_proceeds -= amount;
            }
        }
        debug_assert!(self.check_invariant());
        Ok(())
    }

    /// Lock a portion of available balance.
    pub fn lock(&mut self, amount: Decimal) -> Result<(), AccountError> {
        if amount < Decimal::ZERO {
            return Err(AccountError::NegativeAmount {
                amount: amount.to_string(),
            });
        }
        if amount > self.available {
            return Err(AccountError::InsufficientBalance {
                currency: self.currency.to_string(),
                required: amount.to_string(),
                available: self.available.to_string(),
            });
        }
        self.available -= amount;
        self.locked += amount;
        debug_assert!(self.check_invariant());
        Ok(())
    }

    /// Unlock a portion of locked balance.
    pub fn unlock(&mut self, amount: Decimal) -> Result<(), AccountError> {
        if amount < Decimal::ZERO {
            return Err(AccountError::NegativeAmount {
                amount: amount.to_string(),
            });
        }
        if amount > self.locked {
            return Err(AccountError::InsufficientBalance {
                currency: self.currency.to_string(),
                required: amount.to_string(),
                available: self.locked.to_string(),
            });
        }
        self.locked -= amount;
        self.available += amount;
        debug_assert!(self.check_invariant());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(total: u64) -> Balance {
        Balance::new(Currency::new("USD"), Decimal::from(total))
    }

    #[test]
    fn test_balance_creation() {
        let b = usd(10_000);
        assert_eq!(b.total, Decimal::from(10_000));
        assert_eq!(b.available, Decimal::from(10_000));
        assert_eq!(b.locked, Decimal::ZERO);
        assert!(b.check_invariant());
    }

    #[test]
    fn test_credit_and_debit() {
        let mut b = usd(10_000);
        b.post(PostingAction::Credit, Decimal::from(5_000)).unwrap();
        assert_eq!(b.total, Decimal::from(15_000));

        b.post(PostingAction::Debit, Decimal::from(3_000)).unwrap();
        assert_eq!(b.total, Decimal::from(12_000));
        assert!(b.check_invariant());
    }

    #[test]
    fn test_overdraft_rejected() {
        let mut b = usd(100);
        let err = b.post(PostingAction::Debit, Decimal::from(200)).unwrap_err();
        assert!(matches!(err, AccountError::InsufficientBalance { .. }));
        // Balance unchanged after rejection
        assert_eq!(b.total, Decimal::from(100));
    }

    #[test]
    fn test_short_legs() {
        let mut b = usd(0);
        b.post(PostingAction::ShortCredit, Decimal::from(500)).unwrap();
        assert_eq!(b.short_proceeds, Decimal::from(500));

        b.post(PostingAction::ShortDebit, Decimal::from(200)).unwrap();
        assert_eq!(b.short_proceeds, Decimal::from(300));

        let err = b
            .post(PostingAction::ShortDebit, Decimal::from(1_000))
            .unwrap_err();
        assert!(matches!(err, AccountError::InsufficientBalance { .. }));
    }

    #[test]
    fn test_lock_unlock() {
        let mut b = usd(10_000);
        b.lock(Decimal::from(3_000)).unwrap();
        assert_eq!(b.available, Decimal::from(7_000));
        assert_eq!(b.locked, Decimal::from(3_000));

        b.unlock(Decimal::from(1_000)).unwrap();
        assert_eq!(b.available, Decimal::from(8_000));
        assert!(b.check_invariant());
    }

    #[test]
    fn test_negative_amount_rejected() {
        let mut b = usd(10_000);
        let err = b.post(PostingAction::Credit, Decimal::from(-1)).unwrap_err();
        assert!(matches!(err, AccountError::NegativeAmount { .. }));
    }

    #[test]
    fn test_posting_action_serialization() {
        let json = serde_json::to_string(&PostingAction::ShortCredit).unwrap();
        assert_eq!(json, "\"SHORT_CREDIT\"");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn action_strategy() -> impl Strategy<Value = PostingAction> {
            prop_oneof![
                Just(PostingAction::Credit),
                Just(PostingAction::Debit),
                Just(PostingAction::ShortCredit),
                Just(PostingAction::ShortDebit),
            ]
        }

        proptest! {
            // The total = available + locked invariant survives any
            // sequence of postings, accepted or rejected.
            #[test]
            fn invariant_holds_under_posting_sequences(
                start in 0u64..1_000_000,
                ops in proptest::collection::vec((action_strategy(), 0u64..100_000), 0..50),
            ) {
                let mut balance = Balance::new(Currency::new("USD"), Decimal::from(start));
                for (action, amount) in ops {
                    let _ = balance.post(action, Decimal::from(amount));
                    prop_assert!(balance.check_invariant());
                    prop_assert!(balance.short_proceeds >= Decimal::ZERO);
                }
            }
        }
    }
}
