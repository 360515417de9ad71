//! Direct platform-balance transfers
//!
//! A transfer debits the platform ETH balance immediately, with no
//! review step. The withdrawal workflow shares the debit validation so
//! both paths enforce the same bounds.

use crate::{AccountEngine, Error, Result};
use chrono::Utc;
use ledger_store::{User, WalletAddress};
use rust_decimal::Decimal;

/// Validate and apply a debit against the platform ETH balance.
///
/// Rejects non-positive amounts and amounts above the current balance.
pub(crate) fn debit_platform_balance(user: &mut User, amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount(format!(
            "debit amount must be positive: {}",
            amount
        )));
    }
    if amount > user.eth_balance {
        return Err(Error::InsufficientBalance {
            requested: amount,
            available: user.eth_balance,
        });
    }
    user.eth_balance -= amount;
    Ok(())
}

impl AccountEngine {
    /// Transfer ETH out of the platform balance immediately
    pub async fn transfer(&self, wallet: &str, amount: Decimal) -> Result<User> {
        let wallet = WalletAddress::new(wallet);
        let mut user = self.store().get_user(&wallet)?;

        debit_platform_balance(&mut user, amount)?;
        user.last_active = Utc::now();

        let user = self.store().put_user(user).await?;
        tracing::info!(wallet = %wallet, %amount, "Transfer applied");
        Ok(user)
    }
}
