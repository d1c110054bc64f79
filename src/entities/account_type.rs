// 🗂️ Account Type Registry - Closed set of account types + metadata
//
// Two-level forest:
//   Base  → Asset, Expense, Income
//   Asset → Cash, BankingFacility, CreditCard, Credit, CapitalFund
//
// Every variant is registered explicitly from one catalog list. There is
// no discovery: a key that was never registered fails with UnknownTypeError.

use crate::error::UnknownTypeError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

// ============================================================================
// ACCOUNT TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Asset family (abstract, never carried by an account)
    Asset,

    /// Expense item (money going out)
    Expense,

    /// Income source (money coming in)
    Income,

    /// Cash on hand
    Cash,

    /// Bank or post office account
    BankingFacility,

    /// Credit card (settled later from another asset)
    CreditCard,

    /// Money lent to someone
    Credit,

    /// Opening capital
    CapitalFund,
}

impl AccountType {
    /// Canonical key, the snake_case form of the variant name
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Asset => "asset",
            AccountType::Expense => "expense",
            AccountType::Income => "income",
            AccountType::Cash => "cash",
            AccountType::BankingFacility => "banking_facility",
            AccountType::CreditCard => "credit_card",
            AccountType::Credit => "credit",
            AccountType::CapitalFund => "capital_fund",
        }
    }

    /// Family this type names, when it is the root of one
    pub fn as_family(&self) -> Option<TypeFamily> {
        match self {
            AccountType::Asset => Some(TypeFamily::Asset),
            _ => None,
        }
    }

    /// Metadata from the process-wide registry
    pub fn meta(&self) -> Option<&'static AccountTypeMeta> {
        registry().meta(*self)
    }

    pub fn type_name(&self) -> &'static str {
        registry().type_name(*self).unwrap_or_default()
    }

    pub fn short_name(&self) -> &'static str {
        registry().short_name(*self).unwrap_or_default()
    }

    pub fn type_order(&self) -> i32 {
        registry().type_order(*self)
    }

    pub fn asset_name(&self) -> Option<&'static str> {
        registry().asset_name(*self)
    }

    /// (family order, order within family) for listing across the forest
    pub fn sort_position(&self) -> (i32, i32) {
        if self.is_asset() && *self != AccountType::Asset {
            (AccountType::Asset.type_order(), self.type_order())
        } else {
            (self.type_order(), 0)
        }
    }

    pub fn is_asset(&self) -> bool {
        registry().is_kind_of(*self, AccountType::Asset)
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = UnknownTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        registry().type_for_symbol(s)
    }
}

/// Parent node in the type forest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFamily {
    /// Root: Asset, Expense, Income
    Base,

    /// Asset subtypes
    Asset,
}

// ============================================================================
// TYPE METADATA
// ============================================================================

/// Immutable metadata attached to one AccountType at registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountTypeMeta {
    pub account_type: AccountType,
    pub parent: TypeFamily,
    pub type_name: &'static str,
    pub short_name: &'static str,
    pub type_order: i32,

    /// Types allowed to link TO an account of this type
    pub connectable: Vec<AccountType>,

    /// Category label, Asset family only
    pub asset_name: Option<&'static str>,
}

impl AccountTypeMeta {
    pub fn new(account_type: AccountType, parent: TypeFamily) -> Self {
        AccountTypeMeta {
            account_type,
            parent,
            type_name: "",
            short_name: "",
            type_order: 0,
            connectable: Vec::new(),
            asset_name: None,
        }
    }

    /// Builder: display and short names
    pub fn with_names(mut self, type_name: &'static str, short_name: &'static str) -> Self {
        self.type_name = type_name;
        self.short_name = short_name;
        self
    }

    /// Builder: sort order
    pub fn with_order(mut self, order: i32) -> Self {
        self.type_order = order;
        self
    }

    /// Builder: add a connectable type
    pub fn connectable_to(mut self, account_type: AccountType) -> Self {
        self.connectable.push(account_type);
        self
    }

    /// Builder: asset category label
    pub fn with_asset_name(mut self, asset_name: &'static str) -> Self {
        self.asset_name = Some(asset_name);
        self
    }
}

// ============================================================================
// TYPE REGISTRY
// ============================================================================

/// Catalog of account types
///
/// Built once at startup from `register_standard_types`, sorted, and then
/// shared read-only through `registry()`.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    metas: HashMap<AccountType, AccountTypeMeta>,
    children: HashMap<TypeFamily, Vec<AccountType>>,
    symbols: HashMap<&'static str, AccountType>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the standard catalog, sorted
    pub fn standard() -> Self {
        let mut registry = TypeRegistry::new();
        registry.register_standard_types();
        registry.sort_types();
        registry
    }

    fn register_standard_types(&mut self) {
        // ====================================================================
        // BASE TYPES
        // ====================================================================

        self.register(
            AccountTypeMeta::new(AccountType::Asset, TypeFamily::Base)
                .with_names("Asset account", "asset")
                .with_order(1)
                .connectable_to(AccountType::Asset),
        );

        self.register(
            AccountTypeMeta::new(AccountType::Expense, TypeFamily::Base)
                .with_names("Expense item", "expense")
                .with_order(2)
                .connectable_to(AccountType::Income),
        );

        self.register(
            AccountTypeMeta::new(AccountType::Income, TypeFamily::Base)
                .with_names("Income source", "income")
                .with_order(3)
                .connectable_to(AccountType::Expense),
        );

        // ====================================================================
        // ASSET SUBTYPES
        // ====================================================================

        let asset_subtypes = [
            (AccountType::Cash, 1, "cash"),
            (AccountType::BankingFacility, 2, "bank"),
            (AccountType::CreditCard, 3, "credit card"),
            (AccountType::Credit, 4, "receivable"),
            (AccountType::CapitalFund, 5, "capital"),
        ];

        for (account_type, order, asset_name) in asset_subtypes {
            self.register(
                AccountTypeMeta::new(account_type, TypeFamily::Asset)
                    .with_names("Asset account", "asset")
                    .with_order(order)
                    .connectable_to(AccountType::Asset)
                    .with_asset_name(asset_name),
            );
        }
    }

    /// Register a type under its parent
    ///
    /// Idempotent: a type already present keeps its first metadata and its
    /// position. Returns whether the type was newly added.
    pub fn register(&mut self, meta: AccountTypeMeta) -> bool {
        let account_type = meta.account_type;
        if self.metas.contains_key(&account_type) {
            tracing::debug!(account_type = %account_type, "type already registered");
            return false;
        }

        self.children.entry(meta.parent).or_default().push(account_type);
        self.symbols.insert(account_type.as_str(), account_type);
        self.metas.insert(account_type, meta);
        true
    }

    /// Registered types directly under `family`, in sorted order
    pub fn types(&self, family: TypeFamily) -> &[AccountType] {
        self.children.get(&family).map(Vec::as_slice).unwrap_or_default()
    }

    /// Stable sort of every family by type order (ties keep registration order)
    pub fn sort_types(&mut self) {
        let metas = &self.metas;
        for types in self.children.values_mut() {
            types.sort_by_key(|t| metas.get(t).map(|m| m.type_order).unwrap_or_default());
        }
    }

    pub fn meta(&self, account_type: AccountType) -> Option<&AccountTypeMeta> {
        self.metas.get(&account_type)
    }

    /// Sort order, 0 when unset
    pub fn type_order(&self, account_type: AccountType) -> i32 {
        self.meta(account_type).map(|m| m.type_order).unwrap_or_default()
    }

    pub fn type_name(&self, account_type: AccountType) -> Option<&'static str> {
        self.meta(account_type).map(|m| m.type_name)
    }

    pub fn short_name(&self, account_type: AccountType) -> Option<&'static str> {
        self.meta(account_type).map(|m| m.short_name)
    }

    /// Connectable types, empty when unset
    pub fn connectable_types(&self, account_type: AccountType) -> &[AccountType] {
        self.meta(account_type)
            .map(|m| m.connectable.as_slice())
            .unwrap_or_default()
    }

    pub fn asset_name(&self, account_type: AccountType) -> Option<&'static str> {
        self.meta(account_type).and_then(|m| m.asset_name)
    }

    pub fn symbol_for(&self, account_type: AccountType) -> &'static str {
        account_type.as_str()
    }

    pub fn type_for_symbol(&self, key: &str) -> Result<AccountType, UnknownTypeError> {
        self.symbols
            .get(key)
            .copied()
            .ok_or_else(|| UnknownTypeError(key.to_string()))
    }

    /// `account_type` is `ancestor` or sits inside the family `ancestor` roots
    pub fn is_kind_of(&self, account_type: AccountType, ancestor: AccountType) -> bool {
        if account_type == ancestor {
            return self.metas.contains_key(&account_type);
        }

        match (ancestor.as_family(), self.meta(account_type)) {
            (Some(family), Some(meta)) => meta.parent == family,
            _ => false,
        }
    }

    /// Registered and not the root of a non-empty family
    pub fn is_concrete(&self, account_type: AccountType) -> bool {
        if !self.metas.contains_key(&account_type) {
            return false;
        }
        match account_type.as_family() {
            Some(family) => self.types(family).is_empty(),
            None => true,
        }
    }

    /// Whether an account of `source` may be linked to one of `target`
    pub fn is_connectable(&self, source: AccountType, target: AccountType) -> bool {
        self.connectable_types(target)
            .iter()
            .any(|allowed| self.is_kind_of(source, *allowed))
    }
}

static REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();

/// Process-wide registry, built on first use and read-only afterwards
pub fn registry() -> &'static TypeRegistry {
    REGISTRY.get_or_init(TypeRegistry::standard)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_types_exclude_root() {
        let registry = TypeRegistry::standard();
        assert_eq!(
            registry.types(TypeFamily::Base),
            &[AccountType::Asset, AccountType::Expense, AccountType::Income]
        );
        assert_eq!(registry.types(TypeFamily::Asset).len(), 5);
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = TypeRegistry::new();
        let meta = AccountTypeMeta::new(AccountType::Expense, TypeFamily::Base)
            .with_names("Expense item", "expense")
            .with_order(2);

        assert!(registry.register(meta.clone()));
        assert!(!registry.register(meta.with_order(9)));

        assert_eq!(registry.types(TypeFamily::Base), &[AccountType::Expense]);
        assert_eq!(registry.type_order(AccountType::Expense), 2);
    }

    #[test]
    fn test_sort_types_is_stable_and_repeatable() {
        let mut registry = TypeRegistry::new();
        registry.register(
            AccountTypeMeta::new(AccountType::Income, TypeFamily::Base).with_order(2),
        );
        registry.register(
            AccountTypeMeta::new(AccountType::Expense, TypeFamily::Base).with_order(1),
        );
        registry.register(
            AccountTypeMeta::new(AccountType::Asset, TypeFamily::Base).with_order(2),
        );

        registry.sort_types();
        let first = registry.types(TypeFamily::Base).to_vec();
        registry.sort_types();
        let second = registry.types(TypeFamily::Base).to_vec();

        assert_eq!(first, second);
        // Income and Asset tie on order 2: registration order wins
        assert_eq!(
            first,
            vec![AccountType::Expense, AccountType::Income, AccountType::Asset]
        );
    }

    #[test]
    fn test_unset_attributes_read_as_sentinels() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.type_order(AccountType::Cash), 0);
        assert_eq!(registry.type_name(AccountType::Cash), None);
        assert_eq!(registry.short_name(AccountType::Cash), None);
        assert!(registry.connectable_types(AccountType::Cash).is_empty());
        assert!(registry.types(TypeFamily::Asset).is_empty());
    }

    #[test]
    fn test_symbol_round_trip() {
        let registry = TypeRegistry::standard();
        assert_eq!(registry.symbol_for(AccountType::BankingFacility), "banking_facility");
        assert_eq!(
            registry.type_for_symbol("credit_card").unwrap(),
            AccountType::CreditCard
        );
    }

    #[test]
    fn test_unknown_symbol_fails() {
        let registry = TypeRegistry::standard();
        let err = registry.type_for_symbol("Kernel.exit").unwrap_err();
        assert_eq!(err, UnknownTypeError("Kernel.exit".to_string()));

        assert!("bogus".parse::<AccountType>().is_err());
    }

    #[test]
    fn test_unregistered_symbol_fails_even_if_variant_exists() {
        let mut registry = TypeRegistry::new();
        registry.register(AccountTypeMeta::new(AccountType::Expense, TypeFamily::Base));
        assert!(registry.type_for_symbol("income").is_err());
        assert!(registry.type_for_symbol("expense").is_ok());
    }

    #[test]
    fn test_asset_names_only_on_asset_family() {
        let registry = TypeRegistry::standard();
        assert_eq!(registry.asset_name(AccountType::BankingFacility), Some("bank"));
        assert_eq!(registry.asset_name(AccountType::Cash), Some("cash"));
        assert_eq!(registry.asset_name(AccountType::Expense), None);
    }

    #[test]
    fn test_kind_of_and_concrete() {
        let registry = TypeRegistry::standard();
        assert!(registry.is_kind_of(AccountType::Cash, AccountType::Asset));
        assert!(registry.is_kind_of(AccountType::Expense, AccountType::Expense));
        assert!(!registry.is_kind_of(AccountType::Expense, AccountType::Asset));

        assert!(!registry.is_concrete(AccountType::Asset));
        assert!(registry.is_concrete(AccountType::Cash));
        assert!(registry.is_concrete(AccountType::Income));
    }

    #[test]
    fn test_connectable_matrix() {
        let registry = TypeRegistry::standard();
        assert!(registry.is_connectable(AccountType::Cash, AccountType::BankingFacility));
        assert!(registry.is_connectable(AccountType::Expense, AccountType::Income));
        assert!(registry.is_connectable(AccountType::Income, AccountType::Expense));
        assert!(!registry.is_connectable(AccountType::Expense, AccountType::Cash));
        assert!(!registry.is_connectable(AccountType::Cash, AccountType::Income));
    }

    #[test]
    fn test_global_registry_accessors() {
        assert_eq!(AccountType::Expense.type_name(), "Expense item");
        assert_eq!(AccountType::Income.short_name(), "income");
        assert_eq!(AccountType::CreditCard.type_order(), 3);
        assert!(AccountType::Credit.is_asset());
        assert!(!AccountType::Income.is_asset());
        assert_eq!(AccountType::CapitalFund.to_string(), "capital_fund");
    }

    #[test]
    fn test_sort_position_groups_asset_family_first() {
        assert_eq!(AccountType::CreditCard.sort_position(), (1, 3));
        assert_eq!(AccountType::Income.sort_position(), (3, 0));
        assert!(AccountType::CapitalFund.sort_position() < AccountType::Expense.sort_position());
    }
}
