// 💰 Balance Calculator - Read-side delegate to the ledger
//
// The figure lands in Account::balance for the current read only.
// Nothing here is persisted; every call asks the ledger again.

use crate::book::AccountBook;
use crate::collaborators::{Amount, Ledger};
use crate::entities::Account;
use crate::error::BookResult;
use chrono::NaiveDate;

/// Running balance strictly before `date`, cached on `account.balance`
pub fn balance_before(
    account: &mut Account,
    ledger: &dyn Ledger,
    date: NaiveDate,
) -> BookResult<Amount> {
    let balance = ledger.balance_before_date(&account.id, date)?;
    account.balance = Some(balance);
    tracing::debug!(account_id = %account.id, %date, balance, "balance read");
    Ok(balance)
}

impl AccountBook {
    pub fn balance_before(&self, account: &mut Account, date: NaiveDate) -> BookResult<Amount> {
        balance_before(account, self.ledger(), date)
    }
}
