// 💳 Account Entity - Named, typed, owned bookkeeping account
//
// "Account UUID is IDENTITY, name and type are VALUES"
//
// Invariants:
// - name is non-empty and unique per owning user (checked against the store)
// - partner account, when set, belongs to the same owner
// - account type is concrete (never the abstract Asset family)

use crate::collaborators::{Amount, Ledger};
use crate::entities::account_type::{registry, AccountType};
use crate::error::{BookError, UnknownTypeError, ValidationError};
use crate::guard;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Starter set provisioned for every new user, in creation order
pub const DEFAULT_ASSET_ACCOUNTS: [&str; 1] = ["Cash"];

pub const DEFAULT_EXPENSE_ACCOUNTS: [&str; 17] = [
    "Food",
    "Housing & supplies",
    "Utilities",
    "Clothing & beauty",
    "Medical",
    "Hygiene",
    "Social",
    "Transportation",
    "Communication",
    "Culture",
    "Entertainment",
    "Taxes",
    "Insurance",
    "Miscellaneous",
    "Reserve",
    "Education",
    "Car",
];

pub const DEFAULT_INCOME_ACCOUNTS: [&str; 4] =
    ["Salary", "Bonus", "Interest & dividends", "Gifts"];

// ============================================================================
// ACCOUNT ENTITY
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    // ========================================================================
    // IDENTITY
    // ========================================================================
    /// Stable identity (UUID), assigned on construction
    pub id: String,

    /// Owning user
    pub user_id: String,

    // ========================================================================
    // VALUES
    // ========================================================================
    pub name: String,

    pub account_type: AccountType,

    /// Ordering within the owner's accounts of the same type
    pub sort_key: i64,

    /// Account that receives settlements for this one (same owner)
    pub partner_account_id: Option<String>,

    pub created_at: DateTime<Utc>,

    // ========================================================================
    // TRANSIENT (one read only, never persisted)
    // ========================================================================
    #[serde(skip)]
    pub balance: Option<Amount>,

    #[serde(skip)]
    pub percentage: Option<f64>,

    /// Cached ledger-existence flag for the non-forcing guard
    #[serde(skip)]
    pub(crate) any_entry: Option<bool>,

    #[serde(skip)]
    delete_errors: Vec<String>,
}

impl Account {
    /// Create new account entity with UUID
    pub fn new(user_id: &str, name: &str, account_type: AccountType, sort_key: i64) -> Self {
        Account {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            account_type,
            sort_key,
            partner_account_id: None,
            created_at: Utc::now(),
            balance: None,
            percentage: None,
            any_entry: None,
            delete_errors: Vec::new(),
        }
    }

    /// Checks that need nothing but the record itself
    ///
    /// Name uniqueness and partner ownership need the store and are checked
    /// by `AccountBook` inside the write transaction.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::NameRequired);
        }
        if !registry().is_concrete(self.account_type) {
            return Err(ValidationError::AbstractType);
        }
        Ok(())
    }

    /// Partner must share this account's owner
    pub fn check_partner(&self, partner: &Account) -> Result<(), ValidationError> {
        if partner.user_id != self.user_id {
            return Err(ValidationError::PartnerOwnerMismatch);
        }
        Ok(())
    }

    pub fn set_partner(&mut self, partner: &Account) -> Result<(), ValidationError> {
        self.check_partner(partner)?;
        self.partner_account_id = Some(partner.id.clone());
        Ok(())
    }

    pub fn clear_partner(&mut self) {
        self.partner_account_id = None;
    }

    // ========================================================================
    // NAMING
    // ========================================================================

    /// "Name(category)": asset label for the Asset family, short name otherwise
    ///
    /// Example: "Wallet(cash)", "Food(expense)"
    pub fn name_with_asset_type(&self) -> String {
        let category = self
            .asset_type_name()
            .unwrap_or_else(|| self.account_type.short_name());
        format!("{}({})", self.name, category)
    }

    /// Asset category label, None outside the Asset family
    pub fn asset_type_name(&self) -> Option<&'static str> {
        if self.account_type.is_asset() {
            self.account_type.asset_name()
        } else {
            None
        }
    }

    /// Example: "bob's Wallet(cash)"
    pub fn name_with_user(&self, login_id: &str) -> String {
        format!("{}'s {}", login_id, self.name_with_asset_type())
    }

    /// Kind-of check against a registered type key
    pub fn is_type_in(&self, type_key: &str) -> Result<bool, UnknownTypeError> {
        let ancestor = registry().type_for_symbol(type_key)?;
        Ok(registry().is_kind_of(self.account_type, ancestor))
    }

    // ========================================================================
    // DELETION
    // ========================================================================

    /// Advisory deletion check for bulk listings. Never fails.
    ///
    /// Uses the cached ledger flag. Any failure becomes a message, also kept
    /// in `delete_errors()` until the next call.
    pub fn deletable(&mut self, ledger: &dyn Ledger) -> (bool, Vec<String>) {
        self.delete_errors.clear();

        match guard::assert_not_used(self, ledger, false) {
            Ok(()) => (true, Vec::new()),
            Err(err) => {
                if !matches!(err, BookError::Rule(_)) {
                    tracing::warn!(account_id = %self.id, error = %err, "deletion check failed");
                }
                self.delete_errors.push(err.to_string());
                (false, self.delete_errors.clone())
            }
        }
    }

    /// Messages collected by the last `deletable` call
    pub fn delete_errors(&self) -> &[String] {
        &self.delete_errors
    }

    /// Drop the cached ledger flag so the next advisory check re-reads it
    pub fn forget_usage(&mut self) {
        self.any_entry = None;
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::MemoryLedger;
    use chrono::NaiveDate;

    #[test]
    fn test_account_creation() {
        let account = Account::new("u-1", "Wallet", AccountType::Cash, 1);

        assert!(!account.id.is_empty());
        assert_eq!(account.user_id, "u-1");
        assert_eq!(account.name, "Wallet");
        assert_eq!(account.account_type, AccountType::Cash);
        assert_eq!(account.sort_key, 1);
        assert!(account.partner_account_id.is_none());
        assert!(account.balance.is_none());
    }

    #[test]
    fn test_validate_requires_name() {
        let blank = Account::new("u-1", "   ", AccountType::Expense, 1);
        assert_eq!(blank.validate(), Err(ValidationError::NameRequired));

        let empty = Account::new("u-1", "", AccountType::Expense, 1);
        assert_eq!(empty.validate(), Err(ValidationError::NameRequired));
    }

    #[test]
    fn test_validate_rejects_abstract_type() {
        let account = Account::new("u-1", "Anything", AccountType::Asset, 1);
        assert_eq!(account.validate(), Err(ValidationError::AbstractType));
    }

    #[test]
    fn test_partner_must_share_owner() {
        let mut card = Account::new("u-1", "Visa", AccountType::CreditCard, 1);
        let own_bank = Account::new("u-1", "Checking", AccountType::BankingFacility, 2);
        let other_bank = Account::new("u-2", "Checking", AccountType::BankingFacility, 1);

        assert_eq!(
            card.set_partner(&other_bank),
            Err(ValidationError::PartnerOwnerMismatch)
        );
        assert!(card.partner_account_id.is_none());

        card.set_partner(&own_bank).unwrap();
        assert_eq!(card.partner_account_id.as_deref(), Some(own_bank.id.as_str()));

        card.clear_partner();
        assert!(card.partner_account_id.is_none());
    }

    #[test]
    fn test_name_with_asset_type() {
        let bank = Account::new("u-1", "Checking", AccountType::BankingFacility, 1);
        assert_eq!(bank.name_with_asset_type(), "Checking(bank)");

        let food = Account::new("u-1", "Food", AccountType::Expense, 1);
        assert_eq!(food.name_with_asset_type(), "Food(expense)");

        let salary = Account::new("u-1", "Salary", AccountType::Income, 1);
        assert_eq!(salary.name_with_asset_type(), "Salary(income)");
        assert_eq!(salary.name_with_user("alice"), "alice's Salary(income)");
    }

    #[test]
    fn test_asset_type_name() {
        let cash = Account::new("u-1", "Wallet", AccountType::Cash, 1);
        assert_eq!(cash.asset_type_name(), Some("cash"));

        let food = Account::new("u-1", "Food", AccountType::Expense, 1);
        assert_eq!(food.asset_type_name(), None);
    }

    #[test]
    fn test_is_type_in() {
        let card = Account::new("u-1", "Visa", AccountType::CreditCard, 1);
        assert!(card.is_type_in("asset").unwrap());
        assert!(card.is_type_in("credit_card").unwrap());
        assert!(!card.is_type_in("expense").unwrap());
        assert!(card.is_type_in("Account::Asset").is_err());
    }

    #[test]
    fn test_deletable_with_unused_account() {
        let ledger = MemoryLedger::new();
        let mut account = Account::new("u-1", "Food", AccountType::Expense, 1);

        let (ok, messages) = account.deletable(&ledger);
        assert!(ok);
        assert!(messages.is_empty());
        assert!(account.delete_errors().is_empty());
    }

    #[test]
    fn test_deletable_collects_message_instead_of_failing() {
        let ledger = MemoryLedger::new();
        let mut account = Account::new("u-1", "Food", AccountType::Expense, 1);
        ledger
            .post(&account.id, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 1200)
            .unwrap();

        let (ok, messages) = account.deletable(&ledger);
        assert!(!ok);
        assert_eq!(
            messages,
            vec!["Expense item 'Food' is already in use and cannot be deleted.".to_string()]
        );
        assert_eq!(account.delete_errors(), messages.as_slice());
    }

    #[test]
    fn test_deletable_uses_cached_flag() {
        let ledger = MemoryLedger::new();
        let mut account = Account::new("u-1", "Food", AccountType::Expense, 1);

        assert!(account.deletable(&ledger).0);

        // Ledger changes after the flag was cached: the advisory check is stale
        ledger
            .post(&account.id, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 1200)
            .unwrap();
        assert!(account.deletable(&ledger).0);

        account.forget_usage();
        assert!(!account.deletable(&ledger).0);
    }

    #[test]
    fn test_default_account_lists() {
        assert_eq!(DEFAULT_ASSET_ACCOUNTS.len(), 1);
        assert_eq!(DEFAULT_EXPENSE_ACCOUNTS.len(), 17);
        assert_eq!(DEFAULT_INCOME_ACCOUNTS.len(), 4);
    }
}
