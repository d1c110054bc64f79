// ⚠️ Error tiers - what callers can fix vs. what they must not catch
//
// ValidationError  → user-correctable, field-scoped, safe to show verbatim
// DomainRuleError  → connection / deletion rules, templated messages
// UnknownTypeError → registry inconsistency, fatal

use thiserror::Error;

// ============================================================================
// VALIDATION
// ============================================================================

/// Field-scoped validation failure. Nothing is written when one is raised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name required")]
    NameRequired,

    #[error("duplicate name")]
    DuplicateName,

    #[error("partner must be same owner")]
    PartnerOwnerMismatch,

    #[error("concrete account type required")]
    AbstractType,
}

impl ValidationError {
    /// Field the message belongs to
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::NameRequired | ValidationError::DuplicateName => "name",
            ValidationError::PartnerOwnerMismatch => "partner_account_id",
            ValidationError::AbstractType => "account_type",
        }
    }
}

// ============================================================================
// DOMAIN RULES
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainRuleError {
    #[error("No friend with login id '{login_id}'.")]
    FriendNotFound { login_id: String },

    #[error("Friend '{login_id}' has no account named '{account_name}'.")]
    AccountNotFound {
        login_id: String,
        account_name: String,
    },

    #[error("'{account_name}' is already connected to '{target_name}'.")]
    AlreadyConnected {
        account_name: String,
        target_name: String,
    },

    #[error("{source_type} cannot be connected to {target_type}.")]
    IncompatibleType {
        source_type: String,
        target_type: String,
    },

    #[error("{type_name} '{account_name}' is already in use and cannot be deleted.")]
    UsedAccount {
        type_name: String,
        account_name: String,
    },
}

// ============================================================================
// REGISTRY
// ============================================================================

/// A type key that was never registered. Indicates a programming error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown account type key: {0}")]
pub struct UnknownTypeError(pub String);

// ============================================================================
// BOOK ERROR
// ============================================================================

#[derive(Error, Debug)]
pub enum BookError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Rule(#[from] DomainRuleError),

    #[error(transparent)]
    UnknownType(#[from] UnknownTypeError),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

impl BookError {
    /// Registry inconsistencies must not be swallowed by request handling
    pub fn is_fatal(&self) -> bool {
        matches!(self, BookError::UnknownType(_))
    }

    /// Safe to show to the user as-is
    pub fn is_user_facing(&self) -> bool {
        matches!(self, BookError::Validation(_) | BookError::Rule(_))
    }
}

pub type BookResult<T> = Result<T, BookError>;
