//! Admin dashboard aggregates

use crate::{BackOffice, Result};
use ledger_store::{TransactionStatus, UserStatus, WithdrawalStatus};
use rust_decimal::Decimal;
use serde::Serialize;

/// Aggregates shown on the dashboard landing view
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    /// Registered users
    pub total_users: usize,

    /// Users in `Active` status
    pub active_users: usize,

    /// Sum of completed conversion amounts, stablecoin denominated
    pub total_converted_volume: Decimal,

    /// Sum of platform ETH balances
    pub total_eth_held: Decimal,

    /// Withdrawal requests awaiting an operator
    pub pending_withdrawals: usize,
}

impl BackOffice {
    /// Compute the dashboard aggregates from current store state
    pub fn dashboard(&self, token: &str) -> Result<DashboardSnapshot> {
        self.auth().verify(token)?;

        let users = self.store().list_users()?;
        let total_converted_volume = self
            .store()
            .list_transactions()?
            .iter()
            .filter(|tx| tx.status == TransactionStatus::Completed)
            .map(|tx| tx.amount)
            .sum();
        let pending_withdrawals = self
            .store()
            .list_withdrawals()?
            .iter()
            .filter(|w| {
                matches!(
                    w.status,
                    WithdrawalStatus::Pending | WithdrawalStatus::PendingAssistance
                )
            })
            .count();

        Ok(DashboardSnapshot {
            total_users: users.len(),
            active_users: users
                .iter()
                .filter(|u| u.status == UserStatus::Active)
                .count(),
            total_converted_volume,
            total_eth_held: users.iter().map(|u| u.eth_balance).sum(),
            pending_withdrawals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::back_office_seeded;
    use crate::Error;

    #[tokio::test]
    async fn test_dashboard_over_seed_data() {
        let (office, _temp) = back_office_seeded().await;
        let token = office.test_login();

        let snapshot = office.dashboard(token.as_str()).unwrap();
        assert_eq!(snapshot.total_users, 5);
        assert!(snapshot.active_users <= snapshot.total_users);
        assert!(snapshot.total_converted_volume > Decimal::ZERO);
        assert!(snapshot.pending_withdrawals >= 1);
    }

    #[tokio::test]
    async fn test_dashboard_requires_token() {
        let (office, _temp) = back_office_seeded().await;
        assert!(matches!(
            office.dashboard("bogus"),
            Err(Error::Unauthorized)
        ));
    }
}
