//! Property-based tests for account-engine invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Value conservation: conversion debits and credits balance out
//! - Allowance floor: the allowance never goes below zero
//! - Withdrawal safety: the platform balance never goes negative

use ledger_store::{Config, Currency, Store, WithdrawalStatus};
use mining_engine::{AccountEngine, Error};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;

const ADDR: &str = "0xAb5801a7D398351b8bE11C439e05C5B3259aeC9B";

/// Strategy for generating stablecoin amounts (two decimal places)
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1u64..1_000_000_00u64).prop_map(|cents| Decimal::new(cents as i64, 2))
}

fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![Just(Currency::USDT), Just(Currency::USDC)]
}

/// Engine over a fresh unseeded store in a temp directory
async fn create_test_engine() -> (AccountEngine, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.data_dir = temp_dir.path().to_path_buf();
    config.seed_on_first_open = false;

    let store = Store::open(config).await.unwrap();
    (AccountEngine::new(Arc::new(store)), temp_dir)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: conversion conserves value across the three affected
    /// balances
    #[test]
    fn prop_conversion_conserves_value(
        amount in amount_strategy(),
        currency in currency_strategy(),
        eth_milli in 1u64..10_000u64,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (engine, _temp) = create_test_engine().await;
            let before = engine.connect_wallet(ADDR, None).await.unwrap().user;
            let eth = Decimal::new(eth_milli as i64, 3);

            engine.set_allowance(ADDR, currency, amount).await.unwrap();
            let result = engine.convert(ADDR, amount, currency, eth).await;

            match result {
                Ok(after) => {
                    prop_assert_eq!(
                        after.wallet_balance.get(currency),
                        before.wallet_balance.get(currency) - amount
                    );
                    prop_assert_eq!(after.allowance(currency), Decimal::ZERO);
                    prop_assert_eq!(after.eth_balance, before.eth_balance + eth);
                }
                Err(Error::InsufficientBalance { .. }) => {
                    // Amount above the seeded wallet balance; nothing moved
                    let now = engine.store().get_user(&before.wallet_address).unwrap();
                    prop_assert_eq!(
                        now.wallet_balance.get(currency),
                        before.wallet_balance.get(currency)
                    );
                    prop_assert_eq!(now.eth_balance, before.eth_balance);
                }
                Err(e) => return Err(TestCaseError::fail(format!("unexpected error: {}", e))),
            }

            Ok(())
        })?;
    }

    /// Property: the allowance never goes negative, whatever the
    /// requested conversion amount
    #[test]
    fn prop_allowance_never_negative(
        allowance_cents in 0u64..1_000_00u64,
        request_cents in 1u64..2_000_00u64,
        currency in currency_strategy(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (engine, _temp) = create_test_engine().await;
            engine.connect_wallet(ADDR, None).await.unwrap();

            let allowance = Decimal::new(allowance_cents as i64, 2);
            let request = Decimal::new(request_cents as i64, 2);

            engine.set_allowance(ADDR, currency, allowance).await.unwrap();
            let _ = engine
                .convert(ADDR, request, currency, Decimal::new(1, 3))
                .await;

            let user = engine
                .store()
                .find_user(&ledger_store::WalletAddress::new(ADDR))
                .unwrap()
                .unwrap();
            prop_assert!(user.allowance(currency) >= Decimal::ZERO);

            Ok(())
        })?;
    }

    /// Property: approving withdrawal requests never drives the
    /// platform balance negative
    #[test]
    fn prop_withdrawals_never_overdraw(request_milli in prop::collection::vec(1u64..10u64, 1..8)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (engine, _temp) = create_test_engine().await;
            let wallet = engine.connect_wallet(ADDR, None).await.unwrap().user.wallet_address;

            for milli in request_milli {
                let amount = Decimal::new(milli as i64, 3);
                let request = match engine.request_withdrawal(ADDR, amount).await {
                    Ok(r) => r,
                    Err(Error::InsufficientBalance { .. }) => continue,
                    Err(e) => return Err(TestCaseError::fail(format!("request failed: {}", e))),
                };
                let approved = engine
                    .set_withdrawal_status(request.id, WithdrawalStatus::Approved)
                    .await;
                match approved {
                    Ok(_) | Err(Error::InsufficientBalance { .. }) => {}
                    Err(e) => return Err(TestCaseError::fail(format!("approve failed: {}", e))),
                }

                let user = engine.store().get_user(&wallet).unwrap();
                prop_assert!(user.eth_balance >= Decimal::ZERO);
            }

            Ok(())
        })?;
    }
}
