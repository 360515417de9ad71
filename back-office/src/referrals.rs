//! Referral forest construction and aggregation
//!
//! Users form a forest through `invitation_parent` edges keyed by
//! normalized wallet address. A user is a root when it has no parent or
//! the parent does not resolve to a known wallet; dangling references
//! are tolerated, not errors.
//!
//! Parent data is externally mutable, so construction carries a visited
//! set. Corrupted cycles cannot make it loop; members of a cycle simply
//! never surface as roots.

use ledger_store::{User, WalletAddress};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

/// One user with its resolved referral children
#[derive(Debug, Clone)]
pub struct ReferralNode {
    /// The user at this position
    pub user: User,

    /// Direct referrals
    pub children: Vec<ReferralNode>,
}

/// Aggregates over one subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferralAggregate {
    /// Direct children
    pub direct: usize,

    /// All descendants, at any depth
    pub team_size: usize,
}

/// Build the referral forest from a flat user list.
///
/// Children are matched by normalized wallet address, so casing never
/// splits a chain.
pub fn build_forest(users: &[User]) -> Vec<ReferralNode> {
    let known: HashSet<&WalletAddress> = users.iter().map(|u| &u.wallet_address).collect();
    let mut children_of: HashMap<&WalletAddress, Vec<&User>> = HashMap::new();
    for user in users {
        if let Some(parent) = &user.invitation_parent {
            if known.contains(parent) {
                children_of.entry(parent).or_default().push(user);
            }
        }
    }

    let mut visited: HashSet<&WalletAddress> = HashSet::new();
    users
        .iter()
        .filter(|u| match &u.invitation_parent {
            None => true,
            Some(parent) => !known.contains(parent),
        })
        .map(|root| attach_children(root, &children_of, &mut visited))
        .collect()
}

fn attach_children<'a>(
    user: &'a User,
    children_of: &HashMap<&WalletAddress, Vec<&'a User>>,
    visited: &mut HashSet<&'a WalletAddress>,
) -> ReferralNode {
    visited.insert(&user.wallet_address);

    let mut children = Vec::new();
    if let Some(kids) = children_of.get(&user.wallet_address) {
        for child in kids {
            if !visited.contains(&child.wallet_address) {
                children.push(attach_children(child, children_of, visited));
            }
        }
    }

    ReferralNode {
        user: user.clone(),
        children,
    }
}

/// Aggregate counts and descendant earnings over one subtree
pub fn aggregate(node: &ReferralNode) -> (ReferralAggregate, Decimal) {
    let mut team_size = 0;
    let mut team_earnings = Decimal::ZERO;

    for child in &node.children {
        let (sub, sub_earnings) = aggregate(child);
        team_size += 1 + sub.team_size;
        team_earnings += child.user.eth_balance + sub_earnings;
    }

    (
        ReferralAggregate {
            direct: node.children.len(),
            team_size,
        },
        team_earnings,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ledger_store::{DepositAddresses, UserStatus, WalletBalances};
    use uuid::Uuid;

    fn user(wallet: &str, parent: Option<&str>, eth: Decimal) -> User {
        User {
            id: Uuid::new_v4(),
            wallet_address: WalletAddress::new(wallet),
            referral_code: format!("NX-{}", wallet),
            eth_balance: eth,
            wallet_balance: WalletBalances::default(),
            usdt_allowance: Decimal::ZERO,
            usdc_allowance: Decimal::ZERO,
            deposit_addresses: DepositAddresses::default(),
            invitation_parent: parent.map(WalletAddress::new),
            referrals: 0,
            status: UserStatus::Active,
            join_date: Utc::now(),
            last_active: Utc::now(),
            total_deposits: Decimal::ZERO,
            version: 0,
        }
    }

    fn find<'a>(forest: &'a [ReferralNode], wallet: &str) -> &'a ReferralNode {
        forest
            .iter()
            .find(|n| n.user.wallet_address.as_str() == wallet)
            .unwrap()
    }

    #[test]
    fn test_forest_roots_and_chains() {
        let users = vec![
            user("0xaaa", None, Decimal::ONE),
            user("0xbbb", Some("0xaaa"), Decimal::TWO),
            user("0xccc", Some("0xbbb"), Decimal::ONE),
            user("0xddd", Some("0xnobody"), Decimal::ZERO),
        ];

        let forest = build_forest(&users);
        assert_eq!(forest.len(), 2);

        let a = find(&forest, "0xaaa");
        assert_eq!(a.children.len(), 1);
        assert_eq!(a.children[0].user.wallet_address.as_str(), "0xbbb");
        assert_eq!(a.children[0].children.len(), 1);
        assert_eq!(
            a.children[0].children[0].user.wallet_address.as_str(),
            "0xccc"
        );

        // Dangling parent makes a root, not an error
        let d = find(&forest, "0xddd");
        assert!(d.children.is_empty());
    }

    #[test]
    fn test_forest_matches_case_insensitively() {
        let users = vec![
            user("0xAAA", None, Decimal::ZERO),
            user("0xbbb", Some("0xaaa"), Decimal::ZERO),
        ];

        let forest = build_forest(&users);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].children.len(), 1);
    }

    #[test]
    fn test_cycle_does_not_loop() {
        // Two users pointing at each other: no roots, no recursion
        let users = vec![
            user("0xaaa", Some("0xbbb"), Decimal::ZERO),
            user("0xbbb", Some("0xaaa"), Decimal::ZERO),
            user("0xccc", None, Decimal::ZERO),
        ];

        let forest = build_forest(&users);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].user.wallet_address.as_str(), "0xccc");
    }

    #[test]
    fn test_aggregate_counts_and_earnings() {
        let users = vec![
            user("0xaaa", None, Decimal::from(10)),
            user("0xbbb", Some("0xaaa"), Decimal::from(3)),
            user("0xccc", Some("0xaaa"), Decimal::from(4)),
            user("0xddd", Some("0xbbb"), Decimal::from(5)),
        ];

        let forest = build_forest(&users);
        let (agg, earnings) = aggregate(find(&forest, "0xaaa"));
        assert_eq!(agg.direct, 2);
        assert_eq!(agg.team_size, 3);
        // The root's own balance is not part of team earnings
        assert_eq!(earnings, Decimal::from(12));
    }
}
