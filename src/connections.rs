// 🔗 Connection Graph - Directed links between friends' accounts
//
// connect:          forward edge, plus the reverse edge when interactive
// clear_connection: forward edge only (the reverse edge stays)
//
// Both edges of one connect commit together or not at all.

use crate::book::{AccountBook, ENTITY_ACCOUNT};
use crate::db::{self, Event};
use crate::entities::{registry, Account};
use crate::error::{BookResult, DomainRuleError};
use rusqlite::TransactionBehavior;
use std::collections::BTreeSet;

impl AccountBook {
    /// Link `account` to the friend's account named `target_account_name`
    ///
    /// Returns the target account. With `interactive`, the target is linked
    /// back unless that edge already exists.
    pub fn connect(
        &self,
        account: &Account,
        friend_login_id: &str,
        target_account_name: &str,
        interactive: bool,
    ) -> BookResult<Account> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Stored row, not the caller's copy: it may be stale or gone
        let account = db::find_account(&tx, &account.id)?.ok_or_else(|| {
            DomainRuleError::AccountNotFound {
                login_id: account.user_id.clone(),
                account_name: account.name.clone(),
            }
        })?;

        let friend = self
            .friends
            .find_friend(&account.user_id, friend_login_id)?
            .ok_or_else(|| DomainRuleError::FriendNotFound {
                login_id: friend_login_id.to_string(),
            })?;

        let target = db::find_account_by_name(&tx, &friend.friend_user_id, target_account_name)?
            .ok_or_else(|| DomainRuleError::AccountNotFound {
                login_id: friend_login_id.to_string(),
                account_name: target_account_name.to_string(),
            })?;

        if db::link_exists(&tx, &account.id, &target.id)? {
            return Err(DomainRuleError::AlreadyConnected {
                account_name: account.name.clone(),
                target_name: target.name_with_user(friend_login_id),
            }
            .into());
        }

        if !registry().is_connectable(account.account_type, target.account_type) {
            return Err(DomainRuleError::IncompatibleType {
                source_type: account.name_with_asset_type(),
                target_type: target.name_with_user(friend_login_id),
            }
            .into());
        }

        db::insert_link(&tx, &account.id, &target.id)?;
        let reverse_added = interactive && !db::link_exists(&tx, &target.id, &account.id)?;
        if reverse_added {
            db::insert_link(&tx, &target.id, &account.id)?;
        }

        db::insert_event(
            &tx,
            &Event::new(
                "account_connected",
                ENTITY_ACCOUNT,
                &account.id,
                serde_json::json!({
                    "target_account_id": target.id,
                    "friend_login_id": friend_login_id,
                    "reverse_added": reverse_added,
                }),
                &account.user_id,
            ),
        )?;
        tx.commit()?;

        tracing::info!(
            account_id = %account.id,
            target_account_id = %target.id,
            interactive,
            reverse_added,
            "accounts connected"
        );
        Ok(target)
    }

    /// Remove the edge `account → target`. The reverse edge is untouched.
    ///
    /// Returns whether an edge was removed.
    pub fn clear_connection(&self, account: &Account, target: &Account) -> BookResult<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let removed = db::delete_link(&tx, &account.id, &target.id)?;
        if removed {
            db::insert_event(
                &tx,
                &Event::new(
                    "connection_cleared",
                    ENTITY_ACCOUNT,
                    &account.id,
                    serde_json::json!({ "target_account_id": target.id }),
                    &account.user_id,
                ),
            )?;
        }
        tx.commit()?;

        tracing::info!(
            account_id = %account.id,
            target_account_id = %target.id,
            removed,
            "connection cleared"
        );
        Ok(removed)
    }

    /// Accounts `account` links to
    pub fn connected_accounts(&self, account: &Account) -> BookResult<Vec<Account>> {
        let conn = self.lock()?;
        let ids = db::link_targets(&conn, &account.id)?;
        load_all(&conn, &ids)
    }

    /// Accounts linking to `account`
    pub fn associated_accounts(&self, account: &Account) -> BookResult<Vec<Account>> {
        let conn = self.lock()?;
        let ids = db::link_sources(&conn, &account.id)?;
        load_all(&conn, &ids)
    }

    /// Distinct accounts linked with `account` in either direction
    pub fn connected_or_associated_count(&self, account: &Account) -> BookResult<usize> {
        let conn = self.lock()?;
        let mut linked: BTreeSet<String> =
            db::link_targets(&conn, &account.id)?.into_iter().collect();
        linked.extend(db::link_sources(&conn, &account.id)?);
        Ok(linked.len())
    }
}

fn load_all(conn: &rusqlite::Connection, ids: &[String]) -> BookResult<Vec<Account>> {
    let mut accounts = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(account) = db::find_account(conn, id)? {
            accounts.push(account);
        }
    }
    Ok(accounts)
}
