// 🛡️ Deletion Guard - Accounts with ledger history are never destroyed
//
// force = true  → fresh ledger read, refreshes the cached flag.
//                 Used by AccountBook::destroy before every delete.
// force = false → cached flag (loaded once if never read).
//                 Used only by the advisory Account::deletable.

use crate::collaborators::Ledger;
use crate::entities::Account;
use crate::error::{BookResult, DomainRuleError};

/// Fails with UsedAccount when a ledger entry references the account
pub fn assert_not_used(account: &mut Account, ledger: &dyn Ledger, force: bool) -> BookResult<()> {
    let used = match (force, account.any_entry) {
        (false, Some(cached)) => cached,
        _ => {
            let fresh = ledger.has_entry(&account.id)?;
            account.any_entry = Some(fresh);
            fresh
        }
    };

    tracing::debug!(account_id = %account.id, force, used, "deletion guard checked");

    if used {
        return Err(DomainRuleError::UsedAccount {
            type_name: account.account_type.type_name().to_string(),
            account_name: account.name.clone(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{Amount, MemoryLedger};
    use crate::entities::AccountType;
    use crate::error::BookError;
    use anyhow::anyhow;
    use chrono::NaiveDate;

    struct BrokenLedger;

    impl Ledger for BrokenLedger {
        fn has_entry(&self, _account_id: &str) -> anyhow::Result<bool> {
            Err(anyhow!("ledger offline"))
        }

        fn balance_before_date(
            &self,
            _account_id: &str,
            _date: NaiveDate,
        ) -> anyhow::Result<Amount> {
            Err(anyhow!("ledger offline"))
        }
    }

    fn march_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_forced_check_passes_without_entries() {
        let ledger = MemoryLedger::new();
        let mut account = Account::new("u-1", "Wallet", AccountType::Cash, 1);
        assert!(assert_not_used(&mut account, &ledger, true).is_ok());
        assert_eq!(account.any_entry, Some(false));
    }

    #[test]
    fn test_forced_check_fails_with_entries() {
        let ledger = MemoryLedger::new();
        let mut account = Account::new("u-1", "Wallet", AccountType::Cash, 1);
        ledger.post(&account.id, march_first(), 100).unwrap();

        let err = assert_not_used(&mut account, &ledger, true).unwrap_err();
        match err {
            BookError::Rule(DomainRuleError::UsedAccount { type_name, account_name }) => {
                assert_eq!(type_name, "Asset account");
                assert_eq!(account_name, "Wallet");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_forced_check_ignores_stale_cache() {
        let ledger = MemoryLedger::new();
        let mut account = Account::new("u-1", "Wallet", AccountType::Cash, 1);
        account.any_entry = Some(false);
        ledger.post(&account.id, march_first(), 100).unwrap();

        assert!(assert_not_used(&mut account, &ledger, false).is_ok());
        assert!(assert_not_used(&mut account, &ledger, true).is_err());
        assert_eq!(account.any_entry, Some(true));
    }

    #[test]
    fn test_cached_check_loads_once() {
        let ledger = MemoryLedger::new();
        let mut account = Account::new("u-1", "Wallet", AccountType::Cash, 1);
        ledger.post(&account.id, march_first(), 100).unwrap();

        assert!(assert_not_used(&mut account, &ledger, false).is_err());
        ledger.clear_account(&account.id).unwrap();
        // still the cached answer
        assert!(assert_not_used(&mut account, &ledger, false).is_err());
    }

    #[test]
    fn test_ledger_failure_propagates() {
        let mut account = Account::new("u-1", "Wallet", AccountType::Cash, 1);
        let err = assert_not_used(&mut account, &BrokenLedger, true).unwrap_err();
        assert!(matches!(err, BookError::Collaborator(_)));
        assert!(account.any_entry.is_none());
    }

    #[test]
    fn test_deletable_survives_ledger_failure() {
        let mut account = Account::new("u-1", "Wallet", AccountType::Cash, 1);
        let (ok, messages) = account.deletable(&BrokenLedger);
        assert!(!ok);
        assert_eq!(messages, vec!["ledger offline".to_string()]);
    }
}
