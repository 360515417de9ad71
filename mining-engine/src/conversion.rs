//! Stablecoin conversion and allowance management
//!
//! A conversion moves value from a wallet balance into the platform ETH
//! balance and always emits an audit `Transaction`. The amount must fit
//! inside both the wallet balance and the matching allowance, so the
//! allowance can never go negative.

use crate::{AccountEngine, Error, Result};
use chrono::Utc;
use ledger_store::{Currency, Transaction, TransactionStatus, User, WalletAddress};
use rust_decimal::Decimal;
use uuid::Uuid;

impl AccountEngine {
    /// Set the spending allowance for one currency.
    ///
    /// Replaces the previous allowance outright; amounts below zero are
    /// rejected.
    pub async fn set_allowance(
        &self,
        wallet: &str,
        currency: Currency,
        amount: Decimal,
    ) -> Result<User> {
        if amount < Decimal::ZERO {
            return Err(Error::InvalidAmount(format!(
                "allowance cannot be negative: {}",
                amount
            )));
        }

        let wallet = WalletAddress::new(wallet);
        let mut user = self.store().get_user(&wallet)?;
        *user.allowance_mut(currency) = amount;
        user.last_active = Utc::now();

        let user = self.store().put_user(user).await?;
        tracing::info!(wallet = %wallet, currency = %currency.code(), %amount, "Allowance updated");
        Ok(user)
    }

    /// Convert a stablecoin amount into platform ETH balance.
    ///
    /// Debits the wallet balance and the allowance, credits
    /// `eth_equivalent` to the ETH balance, and commits an audit
    /// transaction in the same write.
    pub async fn convert(
        &self,
        wallet: &str,
        amount: Decimal,
        currency: Currency,
        eth_equivalent: Decimal,
    ) -> Result<User> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(format!(
                "conversion amount must be positive: {}",
                amount
            )));
        }

        let wallet = WalletAddress::new(wallet);
        let mut user = self.store().get_user(&wallet)?;

        let available = user.wallet_balance.get(currency);
        if amount > available {
            return Err(Error::InsufficientBalance {
                requested: amount,
                available,
            });
        }

        let allowance = user.allowance(currency);
        if amount > allowance {
            return Err(Error::AllowanceExceeded {
                requested: amount,
                allowance,
            });
        }

        let now = Utc::now();
        *user.wallet_balance.get_mut(currency) -= amount;
        *user.allowance_mut(currency) -= amount;
        user.eth_balance += eth_equivalent;
        user.total_deposits += amount;
        user.last_active = now;

        let transaction = Transaction {
            id: Uuid::now_v7(),
            user_wallet: wallet.clone(),
            amount,
            currency,
            eth_equivalent,
            status: TransactionStatus::Completed,
            timestamp: now,
        };

        let user = self.store().record_conversion(user, transaction).await?;
        tracing::info!(
            wallet = %wallet,
            currency = %currency.code(),
            %amount,
            eth = %eth_equivalent,
            "Conversion recorded"
        );
        Ok(user)
    }

    /// Audit transactions for one wallet
    pub fn list_transactions_for_user(&self, wallet: &str) -> Result<Vec<Transaction>> {
        Ok(self
            .store()
            .transactions_for_user(&WalletAddress::new(wallet))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::engine;

    const ADDR: &str = "0xAb5801a7D398351b8bE11C439e05C5B3259aeC9B";

    async fn connected(engine: &AccountEngine) -> User {
        engine.connect_wallet(ADDR, None).await.unwrap().user
    }

    #[tokio::test]
    async fn test_set_allowance() {
        let (engine, _temp) = engine().await;
        connected(&engine).await;

        let user = engine
            .set_allowance(ADDR, Currency::USDT, Decimal::from(1_000))
            .await
            .unwrap();
        assert_eq!(user.usdt_allowance, Decimal::from(1_000));
        assert_eq!(user.usdc_allowance, Decimal::ZERO);

        let err = engine
            .set_allowance(ADDR, Currency::USDC, Decimal::from(-5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn test_convert_conserves_value() {
        let (engine, _temp) = engine().await;
        let before = connected(&engine).await;

        engine
            .set_allowance(ADDR, Currency::USDT, Decimal::from(5_000))
            .await
            .unwrap();

        let amount = Decimal::from(2_000);
        let eth = Decimal::new(8, 1); // 0.8
        let after = engine
            .convert(ADDR, amount, Currency::USDT, eth)
            .await
            .unwrap();

        assert_eq!(after.wallet_balance.usdt, before.wallet_balance.usdt - amount);
        assert_eq!(after.usdt_allowance, Decimal::from(3_000));
        assert_eq!(after.eth_balance, before.eth_balance + eth);
        assert_eq!(after.total_deposits, amount);

        // Other currency untouched
        assert_eq!(after.wallet_balance.usdc, before.wallet_balance.usdc);
    }

    #[tokio::test]
    async fn test_convert_emits_audit_transaction() {
        let (engine, _temp) = engine().await;
        connected(&engine).await;
        engine
            .set_allowance(ADDR, Currency::USDC, Decimal::from(500))
            .await
            .unwrap();

        engine
            .convert(ADDR, Decimal::from(500), Currency::USDC, Decimal::new(2, 1))
            .await
            .unwrap();

        let txs = engine.list_transactions_for_user(ADDR).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].currency, Currency::USDC);
        assert_eq!(txs[0].amount, Decimal::from(500));
        assert_eq!(txs[0].status, TransactionStatus::Completed);
    }

    #[tokio::test]
    async fn test_convert_rejects_over_balance() {
        let (engine, _temp) = engine().await;
        let user = connected(&engine).await;
        let over = user.wallet_balance.usdt + Decimal::ONE;

        engine
            .set_allowance(ADDR, Currency::USDT, over)
            .await
            .unwrap();
        let err = engine
            .convert(ADDR, over, Currency::USDT, Decimal::ONE)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientBalance { .. }));

        // Nothing moved
        let now = engine.store().get_user(&user.wallet_address).unwrap();
        assert_eq!(now.wallet_balance.usdt, user.wallet_balance.usdt);
        assert_eq!(now.eth_balance, user.eth_balance);
        assert!(engine.list_transactions_for_user(ADDR).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_convert_rejects_over_allowance() {
        let (engine, _temp) = engine().await;
        let user = connected(&engine).await;

        engine
            .set_allowance(ADDR, Currency::USDT, Decimal::from(100))
            .await
            .unwrap();
        let err = engine
            .convert(ADDR, Decimal::from(101), Currency::USDT, Decimal::ONE)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AllowanceExceeded { .. }));

        let now = engine.store().get_user(&user.wallet_address).unwrap();
        assert_eq!(now.usdt_allowance, Decimal::from(100));
        assert_eq!(now.eth_balance, user.eth_balance);
    }

    #[tokio::test]
    async fn test_convert_rejects_non_positive_amount() {
        let (engine, _temp) = engine().await;
        connected(&engine).await;

        let err = engine
            .convert(ADDR, Decimal::ZERO, Currency::USDT, Decimal::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(_)));
    }
}
