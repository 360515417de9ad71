//! First-open seed dataset
//!
//! A fresh store is populated with a small demo dataset: five users
//! (with referral edges), their conversion history, four withdrawal
//! requests, the marketing chart, scheduled events, and the default
//! gear tiers. Seeding happens exactly once, keyed off the absence of
//! the settings singleton.

use crate::types::*;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Everything written on first open
#[derive(Debug, Clone)]
pub struct SeedData {
    /// Seed users (referral counters pre-denormalized)
    pub users: Vec<User>,
    /// Seed conversion history
    pub transactions: Vec<Transaction>,
    /// Seed withdrawal requests
    pub withdrawals: Vec<WithdrawalRequest>,
    /// Seed site settings
    pub settings: SiteSettings,
}

fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .expect("seed timestamp is valid")
        .with_timezone(&Utc)
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("seed date is valid")
}

/// Deterministic referral code for a seed wallet
fn seed_referral_code(wallet: &str) -> String {
    let tail = wallet.trim_start_matches("0x");
    format!("NX-{}", tail[..8.min(tail.len())].to_ascii_uppercase())
}

fn seed_user(
    wallet: &str,
    eth_balance: Decimal,
    invitation_parent: Option<&str>,
    referrals: u32,
    status: UserStatus,
    join_date: &str,
) -> User {
    let joined = ts(join_date);
    User {
        id: Uuid::new_v4(),
        wallet_address: WalletAddress::new(wallet),
        referral_code: seed_referral_code(wallet),
        eth_balance,
        wallet_balance: WalletBalances {
            usdt: Decimal::from(50_000),
            usdc: Decimal::from(25_000),
        },
        usdt_allowance: Decimal::ZERO,
        usdc_allowance: Decimal::ZERO,
        deposit_addresses: DepositAddresses {
            usdt: format!("{}-usdt", wallet.to_ascii_lowercase()),
            usdc: format!("{}-usdc", wallet.to_ascii_lowercase()),
        },
        invitation_parent: invitation_parent.map(WalletAddress::new),
        referrals,
        status,
        join_date: joined,
        last_active: joined,
        total_deposits: Decimal::ZERO,
        version: 0,
    }
}

// Seed record ids are fixed, so reapplying the seed writes the same keys
fn seed_id(kind: u64, seq: u64) -> Uuid {
    Uuid::from_u128(((kind as u128) << 64) | seq as u128)
}

const SEED_TX: u64 = 0x5eed_0001;
const SEED_WD: u64 = 0x5eed_0002;

fn seed_transaction(
    seq: u64,
    wallet: &str,
    timestamp: &str,
    amount: i64,
    currency: Currency,
    eth_equivalent: Decimal,
    status: TransactionStatus,
) -> Transaction {
    Transaction {
        id: seed_id(SEED_TX, seq),
        user_wallet: WalletAddress::new(wallet),
        amount: Decimal::from(amount),
        currency,
        eth_equivalent,
        status,
        timestamp: ts(timestamp),
    }
}

fn seed_withdrawal(
    seq: u64,
    wallet: &str,
    timestamp: &str,
    amount: Decimal,
    status: WithdrawalStatus,
) -> WithdrawalRequest {
    WithdrawalRequest {
        id: seed_id(SEED_WD, seq),
        user_wallet: WalletAddress::new(wallet),
        amount,
        status,
        user_message: None,
        timestamp: ts(timestamp),
        version: 0,
    }
}

const WALLET_1: &str = "0xAb5801a7D398351b8bE11C439e05C5B3259aeC9B";
const WALLET_2: &str = "0x1234567890abcdef1234567890abcdef12345678";
const WALLET_3: &str = "0xfedcba9876543210fedcba9876543210fedcba98";
const WALLET_4: &str = "0xabcdef1234567890abcdef1234567890abcdef12";
const WALLET_5: &str = "0x11223344556677889900aabbccddeeff11223344";

/// Build the seed dataset
pub fn seed_data() -> SeedData {
    let users = vec![
        seed_user(WALLET_1, Decimal::new(125, 1), None, 2, UserStatus::Active, "2023-10-01T00:00:00Z"),
        seed_user(WALLET_2, Decimal::new(52, 1), Some(WALLET_1), 1, UserStatus::Active, "2023-10-05T00:00:00Z"),
        seed_user(WALLET_3, Decimal::new(8, 1), Some(WALLET_1), 0, UserStatus::Suspended, "2023-10-12T00:00:00Z"),
        seed_user(WALLET_4, Decimal::ZERO, Some(WALLET_2), 0, UserStatus::Pending, "2023-10-15T00:00:00Z"),
        seed_user(WALLET_5, Decimal::new(251, 1), None, 0, UserStatus::Active, "2023-11-01T00:00:00Z"),
    ];

    let transactions = vec![
        seed_transaction(1, WALLET_1, "2023-10-01T10:00:00Z", 10_000, Currency::USDT, Decimal::new(28571, 4), TransactionStatus::Completed),
        seed_transaction(2, WALLET_2, "2023-10-05T12:30:00Z", 5_000, Currency::USDC, Decimal::new(14285, 4), TransactionStatus::Completed),
        seed_transaction(3, WALLET_3, "2023-10-12T15:00:00Z", 1_000, Currency::USDT, Decimal::new(2857, 4), TransactionStatus::Completed),
        seed_transaction(4, WALLET_5, "2023-11-01T09:00:00Z", 25_000, Currency::USDC, Decimal::new(71428, 4), TransactionStatus::Pending),
        seed_transaction(5, WALLET_1, "2023-11-02T11:00:00Z", 5_000, Currency::USDT, Decimal::new(14285, 4), TransactionStatus::Failed),
    ];

    let withdrawals = vec![
        seed_withdrawal(1, WALLET_1, "2023-10-20T14:00:00Z", Decimal::from(5), WithdrawalStatus::Approved),
        seed_withdrawal(2, WALLET_2, "2023-10-25T16:00:00Z", Decimal::new(21, 1), WithdrawalStatus::Pending),
        seed_withdrawal(3, WALLET_5, "2023-11-05T18:00:00Z", Decimal::from(10), WithdrawalStatus::Pending),
        seed_withdrawal(4, WALLET_3, "2023-11-06T10:00:00Z", Decimal::new(5, 1), WithdrawalStatus::Rejected),
    ];

    let chart_data = [
        ("Mon", Decimal::new(125, 1)),
        ("Tue", Decimal::new(152, 1)),
        ("Wed", Decimal::new(138, 1)),
        ("Thu", Decimal::new(181, 1)),
        ("Fri", Decimal::new(214, 1)),
        ("Sat", Decimal::new(259, 1)),
        ("Sun", Decimal::new(233, 1)),
    ]
    .into_iter()
    .map(|(name, value)| ChartPoint {
        name: name.to_string(),
        value,
    })
    .collect();

    let events = vec![
        AppEvent {
            id: "evt_1".to_string(),
            title: "Platform Launch".to_string(),
            date: date("2023-10-01"),
            description: "ETH Mining Nexus is now live! Discover our features.".to_string(),
            kind: EventKind::Milestone,
        },
        AppEvent {
            id: "evt_2".to_string(),
            title: "System Upgrade & AMA".to_string(),
            date: date("2023-10-15"),
            description: "Upgraded mining pool software and a live AMA with the dev team."
                .to_string(),
            kind: EventKind::Update,
        },
        AppEvent {
            id: "evt_3".to_string(),
            title: "New Referral Program".to_string(),
            date: date("2023-11-01"),
            description: "Invite your friends and earn more with our new referral rewards."
                .to_string(),
            kind: EventKind::Announcement,
        },
    ];

    let gear_tiers = vec![
        gear_tier(1, 10, 1_000, Decimal::new(10, 3), Decimal::new(15, 3)),
        gear_tier(2, 1_000, 5_000, Decimal::new(15, 3), Decimal::new(20, 3)),
        gear_tier(3, 5_000, 20_000, Decimal::new(20, 3), Decimal::new(25, 3)),
        gear_tier(4, 20_000, 100_000, Decimal::new(25, 3), Decimal::new(30, 3)),
    ];

    let settings = SiteSettings {
        chart_data,
        events,
        gear_tiers,
        support: SupportContact {
            email: "support@ethminingnexus.io".to_string(),
            telegram: "@NexusMiningSupport".to_string(),
        },
        version: 0,
    };

    SeedData {
        users,
        transactions,
        withdrawals,
        settings,
    }
}

fn gear_tier(gear: u32, lo: i64, hi: i64, min_rate: Decimal, max_rate: Decimal) -> GearTier {
    GearTier {
        gear,
        min_quantity: Decimal::from(lo),
        max_quantity: Decimal::from(hi),
        min_rate,
        max_rate,
        unit: "USD".to_string(),
    }
}
