// Entity Models
//
// - account_type: closed set of account kinds plus their registry
// - account:      the per-user account record and its local rules

pub mod account;
pub mod account_type;

pub use account::Account;
pub use account_type::{registry, AccountType, AccountTypeMeta, TypeFamily, TypeRegistry};
