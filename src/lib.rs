// Household Book - Core Library
// Account types, per-user accounts, friend connections and the deletion guard

pub mod balance;
pub mod book;
pub mod collaborators;
pub mod config;
pub mod connections;
pub mod db;
pub mod entities;
pub mod error;
pub mod guard;
pub mod logging;

// Re-export commonly used types
pub use balance::balance_before;
pub use book::AccountBook;
pub use collaborators::{
    Amount, FriendGraph, FriendLink, Ledger, MemoryFriendGraph, MemoryLedger,
};
pub use config::{BookConfig, DatabaseConfig, LogConfig};
pub use db::{Event, SqliteFriendGraph, SqliteLedger};
pub use entities::{registry, Account, AccountType, AccountTypeMeta, TypeFamily, TypeRegistry};
pub use error::{BookError, BookResult, DomainRuleError, UnknownTypeError, ValidationError};
pub use guard::assert_not_used;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
