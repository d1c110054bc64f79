// 🤝 Collaborators - Ledger and friend graph as seen from the account book
//
// The account book only asks two things of the outside world:
// - Ledger: does any entry reference this account, and what was its
//   balance before a date?
// - Friend graph: is this login id a friend of that user?
//
// SQLite-backed versions live in db.rs. The in-memory versions here are
// used by tests and by embedders that keep ledger state elsewhere.

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Amount in minor units. Arithmetic on it belongs to the ledger.
pub type Amount = i64;

// ============================================================================
// TRAITS
// ============================================================================

pub trait Ledger: Send + Sync {
    /// Whether any ledger entry references the account. Must be a fresh read.
    fn has_entry(&self, account_id: &str) -> Result<bool>;

    /// Running balance of the account strictly before `date`
    fn balance_before_date(&self, account_id: &str, date: NaiveDate) -> Result<Amount>;
}

pub trait FriendGraph: Send + Sync {
    fn find_friend(&self, user_id: &str, friend_login_id: &str) -> Result<Option<FriendLink>>;
}

/// Approved friendship, seen from `user_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendLink {
    pub user_id: String,
    pub friend_user_id: String,
    pub friend_login_id: String,
}

// ============================================================================
// IN-MEMORY LEDGER
// ============================================================================

#[derive(Debug, Clone)]
struct PostedAmount {
    account_id: String,
    date: NaiveDate,
    amount: Amount,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    postings: Arc<RwLock<Vec<PostedAmount>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an amount against an account
    pub fn post(&self, account_id: &str, date: NaiveDate, amount: Amount) -> Result<()> {
        let mut postings = self
            .postings
            .write()
            .map_err(|_| anyhow!("ledger lock poisoned"))?;
        postings.push(PostedAmount {
            account_id: account_id.to_string(),
            date,
            amount,
        });
        Ok(())
    }

    /// Drop every posting for an account
    pub fn clear_account(&self, account_id: &str) -> Result<()> {
        let mut postings = self
            .postings
            .write()
            .map_err(|_| anyhow!("ledger lock poisoned"))?;
        postings.retain(|p| p.account_id != account_id);
        Ok(())
    }
}

impl Ledger for MemoryLedger {
    fn has_entry(&self, account_id: &str) -> Result<bool> {
        let postings = self
            .postings
            .read()
            .map_err(|_| anyhow!("ledger lock poisoned"))?;
        Ok(postings.iter().any(|p| p.account_id == account_id))
    }

    fn balance_before_date(&self, account_id: &str, date: NaiveDate) -> Result<Amount> {
        let postings = self
            .postings
            .read()
            .map_err(|_| anyhow!("ledger lock poisoned"))?;
        Ok(postings
            .iter()
            .filter(|p| p.account_id == account_id && p.date < date)
            .map(|p| p.amount)
            .sum())
    }
}

// ============================================================================
// IN-MEMORY FRIEND GRAPH
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MemoryFriendGraph {
    links: Arc<RwLock<Vec<FriendLink>>>,
}

impl MemoryFriendGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an approved friendship in both directions
    pub fn befriend(
        &self,
        (user_id, login_id): (&str, &str),
        (other_id, other_login_id): (&str, &str),
    ) -> Result<()> {
        let mut links = self
            .links
            .write()
            .map_err(|_| anyhow!("friend graph lock poisoned"))?;
        links.push(FriendLink {
            user_id: user_id.to_string(),
            friend_user_id: other_id.to_string(),
            friend_login_id: other_login_id.to_string(),
        });
        links.push(FriendLink {
            user_id: other_id.to_string(),
            friend_user_id: user_id.to_string(),
            friend_login_id: login_id.to_string(),
        });
        Ok(())
    }
}

impl FriendGraph for MemoryFriendGraph {
    fn find_friend(&self, user_id: &str, friend_login_id: &str) -> Result<Option<FriendLink>> {
        let links = self
            .links
            .read()
            .map_err(|_| anyhow!("friend graph lock poisoned"))?;
        Ok(links
            .iter()
            .find(|l| l.user_id == user_id && l.friend_login_id == friend_login_id)
            .cloned())
    }
}
