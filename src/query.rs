use std::sync::Arc;

use rust_decimal::Decimal;

use crate::{
    account::{EntryKind, LedgerEntry},
    error::LedgerError,
    store::AccountStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub total_credited: Decimal,
    pub total_debited: Decimal,
}

/// Read-only views over an account's history. Each call works on one snapshot.
pub struct LedgerQuery<S> {
    store: Arc<S>,
}

impl<S: AccountStore> LedgerQuery<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn credit_entries(&self, owner_id: &str) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.entries(owner_id, EntryKind::Credit)
    }

    pub fn debit_entries(&self, owner_id: &str) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.entries(owner_id, EntryKind::Debit)
    }

    pub fn totals(&self, owner_id: &str) -> Result<Totals, LedgerError> {
        let account = self.store.get(owner_id)?;
        let sum = |kind: EntryKind| -> Result<Decimal, LedgerError> {
            account
                .history()
                .iter()
                .filter(|entry| entry.kind == kind)
                .try_fold(Decimal::ZERO, |total, entry| total.checked_add(entry.amount))
                .ok_or_else(|| LedgerError::AmountOverflow {
                    owner_id: account.owner_id().to_owned(),
                })
        };
        Ok(Totals {
            total_credited: sum(EntryKind::Credit)?,
            total_debited: sum(EntryKind::Debit)?,
        })
    }

    fn entries(&self, owner_id: &str, kind: EntryKind) -> Result<Vec<LedgerEntry>, LedgerError> {
        let account = self.store.get(owner_id)?;
        Ok(account
            .history()
            .iter()
            .filter(|entry| entry.kind == kind)
            .cloned()
            .collect())
    }
}
