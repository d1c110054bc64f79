// 📒 Account Book - Create / find / save / destroy accounts for users
//
// Every write runs inside an IMMEDIATE transaction: validation reads and
// the write itself see the same snapshot, and two concurrent creations for
// one user cannot both pass the name-uniqueness check.

use crate::collaborators::{FriendGraph, Ledger};
use crate::config::BookConfig;
use crate::db::{self, Event};
use crate::entities::account::{
    DEFAULT_ASSET_ACCOUNTS, DEFAULT_EXPENSE_ACCOUNTS, DEFAULT_INCOME_ACCOUNTS,
};
use crate::entities::{Account, AccountType};
use crate::error::{BookError, BookResult, ValidationError};
use crate::guard;
use anyhow::anyhow;
use rusqlite::{Connection, TransactionBehavior};
use std::sync::{Arc, Mutex, MutexGuard};

pub(crate) const ENTITY_ACCOUNT: &str = "account";

pub struct AccountBook {
    conn: Mutex<Connection>,
    pub(crate) ledger: Arc<dyn Ledger>,
    pub(crate) friends: Arc<dyn FriendGraph>,
}

impl AccountBook {
    /// Wrap an open connection, creating the schema if needed
    pub fn new(
        conn: Connection,
        ledger: Arc<dyn Ledger>,
        friends: Arc<dyn FriendGraph>,
    ) -> BookResult<Self> {
        db::setup_database(&conn)?;
        Ok(AccountBook {
            conn: Mutex::new(conn),
            ledger,
            friends,
        })
    }

    pub fn open(
        config: &BookConfig,
        ledger: Arc<dyn Ledger>,
        friends: Arc<dyn FriendGraph>,
    ) -> BookResult<Self> {
        let conn = db::open_connection(&config.database.path)?;
        let book = Self::new(conn, ledger, friends)?;
        if !config.database.journal_mode.eq_ignore_ascii_case("WAL") {
            book.lock()?
                .pragma_update(None, "journal_mode", &config.database.journal_mode)?;
        }
        tracing::info!(path = %config.database.path, "account book opened");
        Ok(book)
    }

    pub(crate) fn lock(&self) -> BookResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| BookError::Collaborator(anyhow!("account book connection poisoned")))
    }

    pub fn ledger(&self) -> &dyn Ledger {
        self.ledger.as_ref()
    }

    // ========================================================================
    // VALIDATION
    // ========================================================================

    /// Record checks plus the checks that need the store
    fn validate_in(conn: &Connection, account: &Account) -> BookResult<()> {
        account.validate()?;

        if db::name_taken(conn, &account.user_id, &account.name, &account.id)? {
            return Err(ValidationError::DuplicateName.into());
        }

        if let Some(partner_id) = &account.partner_account_id {
            match db::find_account(conn, partner_id)? {
                Some(partner) => account.check_partner(&partner)?,
                None => return Err(ValidationError::PartnerOwnerMismatch.into()),
            }
        }
        Ok(())
    }

    // ========================================================================
    // CREATE / SAVE
    // ========================================================================

    /// Validate and insert; returns the account id
    pub fn create(&self, account: &Account) -> BookResult<String> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        Self::validate_in(&tx, account)?;
        db::insert_account(&tx, account)?;
        db::insert_event(
            &tx,
            &Event::new(
                "account_created",
                ENTITY_ACCOUNT,
                &account.id,
                serde_json::json!({
                    "name": account.name,
                    "account_type": account.account_type.as_str(),
                    "sort_key": account.sort_key,
                }),
                &account.user_id,
            ),
        )?;
        tx.commit()?;

        tracing::info!(
            account_id = %account.id,
            user_id = %account.user_id,
            account_type = %account.account_type,
            "account created"
        );
        Ok(account.id.clone())
    }

    /// Validate and update an existing account
    pub fn save(&self, account: &Account) -> BookResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        Self::validate_in(&tx, account)?;
        if db::update_account(&tx, account)? == 0 {
            return Err(BookError::Collaborator(anyhow!(
                "account {} does not exist",
                account.id
            )));
        }
        db::insert_event(
            &tx,
            &Event::new(
                "account_updated",
                ENTITY_ACCOUNT,
                &account.id,
                serde_json::json!({
                    "name": account.name,
                    "sort_key": account.sort_key,
                    "partner_account_id": account.partner_account_id,
                }),
                &account.user_id,
            ),
        )?;
        tx.commit()?;

        tracing::info!(account_id = %account.id, "account saved");
        Ok(())
    }

    /// Point `account` at a partner and persist it
    pub fn set_partner(&self, account: &mut Account, partner: &Account) -> BookResult<()> {
        let previous = account.partner_account_id.clone();
        account.set_partner(partner)?;
        if let Err(err) = self.save(account) {
            account.partner_account_id = previous;
            return Err(err);
        }
        Ok(())
    }

    /// Create accounts of one type, sort keys counting up from `sort_key_start`
    pub fn create_accounts(
        &self,
        user_id: &str,
        account_type: AccountType,
        names: &[&str],
        sort_key_start: i64,
    ) -> BookResult<Vec<Account>> {
        let mut created = Vec::with_capacity(names.len());
        for (sort_key, name) in (sort_key_start..).zip(names) {
            let account = Account::new(user_id, name, account_type, sort_key);
            self.create(&account)?;
            created.push(account);
        }
        Ok(created)
    }

    /// Provision the starter set for a new user: one cash account, the
    /// standard expense items, then the standard income sources
    ///
    /// Not idempotent: a second call fails on the first duplicate name.
    pub fn create_default_accounts(&self, user_id: &str) -> BookResult<Vec<Account>> {
        let mut accounts =
            self.create_accounts(user_id, AccountType::Cash, &DEFAULT_ASSET_ACCOUNTS, 1)?;
        accounts.extend(self.create_accounts(
            user_id,
            AccountType::Expense,
            &DEFAULT_EXPENSE_ACCOUNTS,
            1,
        )?);
        accounts.extend(self.create_accounts(
            user_id,
            AccountType::Income,
            &DEFAULT_INCOME_ACCOUNTS,
            1,
        )?);

        tracing::info!(user_id, count = accounts.len(), "default accounts created");
        Ok(accounts)
    }

    // ========================================================================
    // FIND
    // ========================================================================

    pub fn find(&self, account_id: &str) -> BookResult<Option<Account>> {
        let conn = self.lock()?;
        db::find_account(&conn, account_id)
    }

    /// Account by id, only if owned by `user_id`
    pub fn get(&self, user_id: &str, account_id: &str) -> BookResult<Option<Account>> {
        let conn = self.lock()?;
        db::find_account_for_user(&conn, user_id, account_id)
    }

    pub fn get_by_name(&self, user_id: &str, name: &str) -> BookResult<Option<Account>> {
        let conn = self.lock()?;
        db::find_account_by_name(&conn, user_id, name)
    }

    pub fn accounts_of(&self, user_id: &str) -> BookResult<Vec<Account>> {
        let conn = self.lock()?;
        db::accounts_for_user(&conn, user_id)
    }

    pub fn events_for(&self, account_id: &str) -> BookResult<Vec<Event>> {
        let conn = self.lock()?;
        db::get_events_for_entity(&conn, ENTITY_ACCOUNT, account_id)
    }

    // ========================================================================
    // DESTROY
    // ========================================================================

    /// Delete an account after a fresh ledger check
    ///
    /// Fails with UsedAccount, leaving everything in place, when any ledger
    /// entry references the account. Links touching it go with it.
    pub fn destroy(&self, account: &mut Account) -> BookResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        guard::assert_not_used(account, self.ledger.as_ref(), true)?;

        db::delete_account(&tx, &account.id)?;
        db::insert_event(
            &tx,
            &Event::new(
                "account_destroyed",
                ENTITY_ACCOUNT,
                &account.id,
                serde_json::json!({
                    "name": account.name,
                    "account_type": account.account_type.as_str(),
                }),
                &account.user_id,
            ),
        )?;
        tx.commit()?;

        tracing::info!(account_id = %account.id, user_id = %account.user_id, "account destroyed");
        Ok(())
    }

    /// Advisory deletion check for every account of a user
    pub fn deletion_report(&self, user_id: &str) -> BookResult<Vec<(Account, bool, Vec<String>)>> {
        let accounts = self.accounts_of(user_id)?;
        Ok(accounts
            .into_iter()
            .map(|mut account| {
                let (ok, messages) = account.deletable(self.ledger.as_ref());
                (account, ok, messages)
            })
            .collect())
    }
}
