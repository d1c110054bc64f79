use crate::collaborators::{Amount, FriendGraph, FriendLink, Ledger};
use crate::entities::{Account, AccountType};
use crate::error::{BookError, BookResult};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;

/// Event for audit trail ("Every change is an event")
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

/// Open a database file, or an in-memory database for ":memory:"
pub fn open_connection(path: &str) -> Result<Connection> {
    let conn = if path == ":memory:" {
        Connection::open_in_memory()?
    } else {
        Connection::open(Path::new(path))
            .with_context(|| format!("Failed to open database at {}", path))?
    };
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL lets ledger/friend readers run beside the book's writer
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Accounts + directed links
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            account_type TEXT NOT NULL,
            sort_key INTEGER NOT NULL DEFAULT 0,
            partner_account_id TEXT,
            created_at TEXT NOT NULL,
            UNIQUE (user_id, name)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS account_links (
            source_account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            target_account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (source_account_id, target_account_id)
        )",
        [],
    )?;

    // ==========================================================================
    // Events Table (audit trail)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Read models owned by other modules (ledger, users/friends)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS account_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            account_id TEXT NOT NULL,
            date TEXT NOT NULL,
            amount INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            login_id TEXT UNIQUE NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS friendships (
            user_id TEXT NOT NULL,
            friend_user_id TEXT NOT NULL,
            PRIMARY KEY (user_id, friend_user_id)
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_accounts_user ON accounts(user_id, account_type, sort_key)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_links_target ON account_links(target_account_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_entries_account ON account_entries(account_id, date)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// EVENTS
// ============================================================================

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> BookResult<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events for a specific entity, newest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> BookResult<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY id DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: parse_timestamp(1, &timestamp_str)?,
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
                })?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ============================================================================
// ACCOUNTS
// ============================================================================

const ACCOUNT_COLUMNS: &str =
    "id, user_id, name, account_type, sort_key, partner_account_id, created_at";

/// Raw row; the type key is resolved against the registry afterwards
struct AccountRow {
    id: String,
    user_id: String,
    name: String,
    type_key: String,
    sort_key: i64,
    partner_account_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl AccountRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let created_at: String = row.get(6)?;
        Ok(AccountRow {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            type_key: row.get(3)?,
            sort_key: row.get(4)?,
            partner_account_id: row.get(5)?,
            created_at: parse_timestamp(6, &created_at)?,
        })
    }

    fn into_account(self) -> BookResult<Account> {
        let account_type: AccountType = self.type_key.parse()?;
        let mut account = Account::new(&self.user_id, &self.name, account_type, self.sort_key);
        account.id = self.id;
        account.partner_account_id = self.partner_account_id;
        account.created_at = self.created_at;
        Ok(account)
    }
}

pub fn insert_account(conn: &Connection, account: &Account) -> BookResult<()> {
    conn.execute(
        "INSERT INTO accounts (
            id, user_id, name, account_type, sort_key, partner_account_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            account.id,
            account.user_id,
            account.name,
            account.account_type.as_str(),
            account.sort_key,
            account.partner_account_id,
            account.created_at.to_rfc3339(),
        ],
    )
    .map_err(map_unique_violation)?;
    Ok(())
}

/// Returns the number of rows updated (0 when the account is gone)
pub fn update_account(conn: &Connection, account: &Account) -> BookResult<usize> {
    let updated = conn
        .execute(
            "UPDATE accounts
             SET name = ?2, account_type = ?3, sort_key = ?4, partner_account_id = ?5
             WHERE id = ?1",
            params![
                account.id,
                account.name,
                account.account_type.as_str(),
                account.sort_key,
                account.partner_account_id,
            ],
        )
        .map_err(map_unique_violation)?;
    Ok(updated)
}

/// Delete an account row and every link touching it
pub fn delete_account(conn: &Connection, account_id: &str) -> BookResult<usize> {
    conn.execute(
        "DELETE FROM account_links WHERE source_account_id = ?1 OR target_account_id = ?1",
        params![account_id],
    )?;
    conn.execute(
        "UPDATE accounts SET partner_account_id = NULL WHERE partner_account_id = ?1",
        params![account_id],
    )?;
    let deleted = conn.execute("DELETE FROM accounts WHERE id = ?1", params![account_id])?;
    Ok(deleted)
}

pub fn find_account(conn: &Connection, account_id: &str) -> BookResult<Option<Account>> {
    let sql = format!("SELECT {} FROM accounts WHERE id = ?1", ACCOUNT_COLUMNS);
    conn.query_row(&sql, params![account_id], AccountRow::from_row)
        .optional()?
        .map(AccountRow::into_account)
        .transpose()
}

pub fn find_account_for_user(
    conn: &Connection,
    user_id: &str,
    account_id: &str,
) -> BookResult<Option<Account>> {
    let sql = format!(
        "SELECT {} FROM accounts WHERE user_id = ?1 AND id = ?2",
        ACCOUNT_COLUMNS
    );
    conn.query_row(&sql, params![user_id, account_id], AccountRow::from_row)
        .optional()?
        .map(AccountRow::into_account)
        .transpose()
}

pub fn find_account_by_name(
    conn: &Connection,
    user_id: &str,
    name: &str,
) -> BookResult<Option<Account>> {
    let sql = format!(
        "SELECT {} FROM accounts WHERE user_id = ?1 AND name = ?2",
        ACCOUNT_COLUMNS
    );
    conn.query_row(&sql, params![user_id, name], AccountRow::from_row)
        .optional()?
        .map(AccountRow::into_account)
        .transpose()
}

/// Every account of a user, ordered by type order then sort key
pub fn accounts_for_user(conn: &Connection, user_id: &str) -> BookResult<Vec<Account>> {
    let sql = format!("SELECT {} FROM accounts WHERE user_id = ?1", ACCOUNT_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![user_id], AccountRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut accounts = rows
        .into_iter()
        .map(AccountRow::into_account)
        .collect::<BookResult<Vec<_>>>()?;
    accounts.sort_by_key(|a| (a.account_type.sort_position(), a.sort_key));
    Ok(accounts)
}

/// Whether another account of `user_id` already uses `name`
pub fn name_taken(
    conn: &Connection,
    user_id: &str,
    name: &str,
    except_id: &str,
) -> BookResult<bool> {
    let taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM accounts WHERE user_id = ?1 AND name = ?2 AND id <> ?3)",
        params![user_id, name, except_id],
        |row| row.get(0),
    )?;
    Ok(taken)
}

/// UNIQUE(user_id, name) clash → DuplicateName; other constraints stay storage errors
fn map_unique_violation(err: rusqlite::Error) -> BookError {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            crate::error::ValidationError::DuplicateName.into()
        }
        other => other.into(),
    }
}

// ============================================================================
// LINKS (directed edges)
// ============================================================================

pub fn link_exists(conn: &Connection, source_id: &str, target_id: &str) -> BookResult<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM account_links
                       WHERE source_account_id = ?1 AND target_account_id = ?2)",
        params![source_id, target_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn insert_link(conn: &Connection, source_id: &str, target_id: &str) -> BookResult<()> {
    conn.execute(
        "INSERT INTO account_links (source_account_id, target_account_id) VALUES (?1, ?2)",
        params![source_id, target_id],
    )?;
    Ok(())
}

/// Returns whether an edge was removed
pub fn delete_link(conn: &Connection, source_id: &str, target_id: &str) -> BookResult<bool> {
    let deleted = conn.execute(
        "DELETE FROM account_links WHERE source_account_id = ?1 AND target_account_id = ?2",
        params![source_id, target_id],
    )?;
    Ok(deleted > 0)
}

/// Targets of edges leaving `account_id`
pub fn link_targets(conn: &Connection, account_id: &str) -> BookResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT target_account_id FROM account_links
         WHERE source_account_id = ?1 ORDER BY created_at, target_account_id",
    )?;
    let ids = stmt
        .query_map(params![account_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

/// Sources of edges arriving at `account_id`
pub fn link_sources(conn: &Connection, account_id: &str) -> BookResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT source_account_id FROM account_links
         WHERE target_account_id = ?1 ORDER BY created_at, source_account_id",
    )?;
    let ids = stmt
        .query_map(params![account_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

pub fn count_links(conn: &Connection) -> BookResult<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM account_links", [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// SQLITE COLLABORATORS
// ============================================================================

/// Ledger over the `account_entries` table
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    pub fn new(conn: Connection) -> Self {
        SqliteLedger {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: &str) -> Result<Self> {
        Ok(Self::new(open_connection(path)?))
    }
}

impl Ledger for SqliteLedger {
    fn has_entry(&self, account_id: &str) -> Result<bool> {
        let conn = self.conn.lock().map_err(|_| anyhow!("ledger connection poisoned"))?;
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM account_entries WHERE account_id = ?1)",
                params![account_id],
                |row| row.get(0),
            )
            .context("Failed to query account entries")?;
        Ok(exists)
    }

    fn balance_before_date(&self, account_id: &str, date: NaiveDate) -> Result<Amount> {
        let conn = self.conn.lock().map_err(|_| anyhow!("ledger connection poisoned"))?;
        let balance: Amount = conn
            .query_row(
                "SELECT COALESCE(SUM(amount), 0) FROM account_entries
                 WHERE account_id = ?1 AND date < ?2",
                params![account_id, date.format("%Y-%m-%d").to_string()],
                |row| row.get(0),
            )
            .context("Failed to aggregate account entries")?;
        Ok(balance)
    }
}

/// Friend graph over the `users` and `friendships` tables
pub struct SqliteFriendGraph {
    conn: Mutex<Connection>,
}

impl SqliteFriendGraph {
    pub fn new(conn: Connection) -> Self {
        SqliteFriendGraph {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: &str) -> Result<Self> {
        Ok(Self::new(open_connection(path)?))
    }
}

impl FriendGraph for SqliteFriendGraph {
    fn find_friend(&self, user_id: &str, friend_login_id: &str) -> Result<Option<FriendLink>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("friend graph connection poisoned"))?;
        let link = conn
            .query_row(
                "SELECT f.user_id, f.friend_user_id, u.login_id
                 FROM friendships f JOIN users u ON u.id = f.friend_user_id
                 WHERE f.user_id = ?1 AND u.login_id = ?2",
                params![user_id, friend_login_id],
                |row| {
                    Ok(FriendLink {
                        user_id: row.get(0)?,
                        friend_user_id: row.get(1)?,
                        friend_login_id: row.get(2)?,
                    })
                },
            )
            .optional()
            .context("Failed to query friendships")?;
        Ok(link)
    }
}
