//! Account: a user's cash balance record.

use crate::domain::{Decimal, UserId};
use serde::{Deserialize, Serialize};

/// One account per authenticated user. The cash balance is denominated in a
/// single fiat unit and is mutated only by settlement and deposit/withdraw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Externally issued stable identifier.
    pub user_id: UserId,
    /// Non-negative cash balance in USD.
    pub cash_balance: Decimal,
}

impl Account {
    /// A fresh account starts with a zero balance.
    pub fn new(user_id: UserId) -> Self {
        Account {
            user_id,
            cash_balance: Decimal::zero(),
        }
    }

    /// Whether the balance covers the given total.
    pub fn can_afford(&self, total: Decimal) -> bool {
        self.cash_balance >= total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_starts_empty() {
        let account = Account::new(UserId::new("u-1".to_string()));
        assert!(account.cash_balance.is_zero());
    }

    #[test]
    fn test_can_afford_boundary() {
        let mut account = Account::new(UserId::new("u-1".to_string()));
        account.cash_balance = Decimal::from_str_canonical("608.50").unwrap();

        assert!(account.can_afford(Decimal::from_str_canonical("608.50").unwrap()));
        assert!(!account.can_afford(Decimal::from_str_canonical("608.51").unwrap()));
    }
}
