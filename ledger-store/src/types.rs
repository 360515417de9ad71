//! Core types for the platform ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (Decimal for balances)
//!
//! Every mutable record carries a `version` counter used for
//! compare-and-swap writes (see [`crate::storage`]).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Wallet address, the case-insensitive unique key for a user.
///
/// Construction normalizes to lowercase so every comparison in the
/// system (account lookup, referral parent matching, chat session keys)
/// uses the same rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Create a normalized wallet address
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_ascii_lowercase())
    }

    /// Get as string (normalized form)
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stablecoin accepted for conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Currency {
    /// Tether USD
    USDT,
    /// USD Coin
    USDC,
}

impl Currency {
    /// Ticker code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USDT => "USDT",
            Currency::USDC => "USDC",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "USDT" => Some(Currency::USDT),
            "USDC" => Some(Currency::USDC),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Account status, administrator controlled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum UserStatus {
    /// Normal account
    Active = 1,
    /// Frozen by an administrator
    Suspended = 2,
    /// Awaiting review
    Pending = 3,
}

/// Simulated external wallet balances, per currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WalletBalances {
    /// USDT balance
    pub usdt: Decimal,
    /// USDC balance
    pub usdc: Decimal,
}

impl WalletBalances {
    /// Balance for a currency
    pub fn get(&self, currency: Currency) -> Decimal {
        match currency {
            Currency::USDT => self.usdt,
            Currency::USDC => self.usdc,
        }
    }

    /// Mutable balance for a currency
    pub fn get_mut(&mut self, currency: Currency) -> &mut Decimal {
        match currency {
            Currency::USDT => &mut self.usdt,
            Currency::USDC => &mut self.usdc,
        }
    }
}

/// Per-currency deposit addresses generated at account creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DepositAddresses {
    /// USDT deposit address
    pub usdt: String,
    /// USDC deposit address
    pub usdc: String,
}

/// One user, keyed by wallet address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Opaque identifier, generated at creation
    pub id: Uuid,

    /// Normalized wallet address (unique key)
    pub wallet_address: WalletAddress,

    /// Unique referral code generated at creation
    pub referral_code: String,

    /// Platform-held reward balance (ETH)
    pub eth_balance: Decimal,

    /// Simulated external wallet balances
    pub wallet_balance: WalletBalances,

    /// USDT spending allowance
    pub usdt_allowance: Decimal,

    /// USDC spending allowance
    pub usdc_allowance: Decimal,

    /// Deposit addresses issued at creation
    pub deposit_addresses: DepositAddresses,

    /// Wallet address of the referrer, if any
    pub invitation_parent: Option<WalletAddress>,

    /// Count of direct referral children (denormalized counter)
    pub referrals: u32,

    /// Account status
    pub status: UserStatus,

    /// Account creation timestamp
    pub join_date: DateTime<Utc>,

    /// Last activity timestamp
    pub last_active: DateTime<Utc>,

    /// Cumulative converted volume (USD-equivalent)
    pub total_deposits: Decimal,

    /// Optimistic concurrency version
    pub version: u64,
}

impl User {
    /// Allowance for a currency
    pub fn allowance(&self, currency: Currency) -> Decimal {
        match currency {
            Currency::USDT => self.usdt_allowance,
            Currency::USDC => self.usdc_allowance,
        }
    }

    /// Mutable allowance for a currency
    pub fn allowance_mut(&mut self, currency: Currency) -> &mut Decimal {
        match currency {
            Currency::USDT => &mut self.usdt_allowance,
            Currency::USDC => &mut self.usdc_allowance,
        }
    }
}

/// Conversion outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionStatus {
    /// Conversion applied
    Completed = 1,
    /// Conversion in flight
    Pending = 2,
    /// Conversion failed
    Failed = 3,
}

/// Immutable record of one conversion event.
///
/// Append-only: transactions are never edited after insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction ID (UUIDv7 for time-ordering)
    pub id: Uuid,

    /// Wallet that converted
    pub user_wallet: WalletAddress,

    /// Amount spent, in `currency`
    pub amount: Decimal,

    /// Source currency
    pub currency: Currency,

    /// ETH credited to the platform balance
    pub eth_equivalent: Decimal,

    /// Outcome
    pub status: TransactionStatus,

    /// Event timestamp
    pub timestamp: DateTime<Utc>,
}

/// Withdrawal request state.
///
/// Direct path: `Pending -> {Approved, Rejected}`.
/// Assisted path: `PendingAssistance -> AwaitingUserConfirmation -> Approved`
/// or `PendingAssistance -> Rejected`. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum WithdrawalStatus {
    /// Direct request awaiting admin decision
    Pending = 1,
    /// Finalized; balance has been debited (terminal)
    Approved = 2,
    /// Declined by an administrator (terminal)
    Rejected = 3,
    /// Assisted request awaiting admin preparation
    PendingAssistance = 4,
    /// Prepared by an admin, awaiting the requesting user's confirmation
    AwaitingUserConfirmation = 5,
}

impl WithdrawalStatus {
    /// Check if the status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, WithdrawalStatus::Approved | WithdrawalStatus::Rejected)
    }

    /// Check whether a transition to `next` is legal
    pub fn can_transition_to(&self, next: WithdrawalStatus) -> bool {
        use WithdrawalStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (PendingAssistance, AwaitingUserConfirmation)
                | (PendingAssistance, Rejected)
                | (AwaitingUserConfirmation, Approved)
                | (AwaitingUserConfirmation, Rejected)
        )
    }

    /// Human-readable label, matching the admin view
    pub fn label(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "Pending",
            WithdrawalStatus::Approved => "Approved",
            WithdrawalStatus::Rejected => "Rejected",
            WithdrawalStatus::PendingAssistance => "Pending Assistance",
            WithdrawalStatus::AwaitingUserConfirmation => "Awaiting User Confirmation",
        }
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One withdrawal request.
///
/// Only `status` (and `version`) change after creation; the balance is
/// debited exactly once, atomically with the `Approved` transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    /// Unique request ID
    pub id: Uuid,

    /// Requesting wallet
    pub user_wallet: WalletAddress,

    /// Requested ETH amount
    pub amount: Decimal,

    /// Current state
    pub status: WithdrawalStatus,

    /// Optional free-text message (assisted path)
    pub user_message: Option<String>,

    /// Creation timestamp
    pub timestamp: DateTime<Utc>,

    /// Optimistic concurrency version
    pub version: u64,
}

/// Chat message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ChatSender {
    /// The connected user
    User = 1,
    /// A support administrator
    Admin = 2,
}

/// One live-support message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message body
    pub text: String,

    /// Author
    pub sender: ChatSender,

    /// Send timestamp
    pub timestamp: DateTime<Utc>,
}

/// Live-support session, keyed by wallet address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    /// Session key
    pub wallet: WalletAddress,

    /// Ordered message history
    pub messages: Vec<ChatMessage>,

    /// True when the admin side has unread user messages
    pub unread_admin: bool,

    /// Timestamp of the most recent message
    pub last_message_at: Option<DateTime<Utc>>,

    /// Optimistic concurrency version
    pub version: u64,
}

impl ChatSession {
    /// Create an empty session for a wallet
    pub fn new(wallet: WalletAddress) -> Self {
        Self {
            wallet,
            messages: Vec::new(),
            unread_admin: false,
            last_message_at: None,
            version: 0,
        }
    }
}

/// One chart data point shown on the marketing site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Label (e.g. weekday)
    pub name: String,

    /// Value
    pub value: Decimal,
}

/// Scheduled event category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventKind {
    /// Platform milestone
    Milestone = 1,
    /// Software or infrastructure update
    Update = 2,
    /// Marketing announcement
    Announcement = 3,
}

/// Scheduled site event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppEvent {
    /// Opaque event ID
    pub id: String,

    /// Headline
    pub title: String,

    /// Scheduled date
    pub date: NaiveDate,

    /// Body copy
    pub description: String,

    /// Category
    pub kind: EventKind,
}

/// Administrator-defined payout tier.
///
/// `quantity` ranges are lower-inclusive, upper-exclusive: an amount
/// belongs to the tier when `min_quantity <= amount < max_quantity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GearTier {
    /// Tier number (1-based)
    pub gear: u32,

    /// Inclusive lower bound of the investment range (USD)
    pub min_quantity: Decimal,

    /// Exclusive upper bound of the investment range (USD)
    pub max_quantity: Decimal,

    /// Lower bound of the daily rate of return
    pub min_rate: Decimal,

    /// Upper bound of the daily rate of return
    pub max_rate: Decimal,

    /// Display unit for the range
    pub unit: String,
}

impl GearTier {
    /// Range label in the `lo ~ hi` form used by the admin view
    pub fn range_label(&self) -> String {
        format!("{} ~ {}", self.min_quantity, self.max_quantity)
    }
}

/// Support contact information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SupportContact {
    /// Support email address
    pub email: String,

    /// Support Telegram handle
    pub telegram: String,
}

/// Singleton site configuration, mutated wholesale by administrators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSettings {
    /// Ordered chart data points
    pub chart_data: Vec<ChartPoint>,

    /// Scheduled events
    pub events: Vec<AppEvent>,

    /// Tiered payout rules
    pub gear_tiers: Vec<GearTier>,

    /// Support contact info
    pub support: SupportContact,

    /// Optimistic concurrency version
    pub version: u64,
}
