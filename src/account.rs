use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

pub type OwnerId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Credit,
    Debit,
}

/// A single immutable line of an account's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub kind: EntryKind,
    pub amount: Decimal,
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn credit(amount: Decimal, description: Option<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: EntryKind::Credit,
            amount,
            description,
            timestamp,
        }
    }

    pub fn debit(amount: Decimal, description: Option<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: EntryKind::Debit,
            amount,
            description,
            timestamp,
        }
    }

    /// Balance change this entry causes when appended.
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            EntryKind::Credit => self.amount,
            EntryKind::Debit => -self.amount,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("Entry amount must be positive, got {amount}")]
    NonPositiveAmount { amount: Decimal },
    #[error("Insufficient funds in account `{owner_id}`: balance {balance}, requested {requested}")]
    InsufficientFunds {
        owner_id: OwnerId,
        balance: Decimal,
        requested: Decimal,
    },
    #[error("Balance of account `{owner_id}` would exceed the largest representable amount")]
    BalanceOverflow { owner_id: OwnerId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    owner_id: OwnerId,
    balance: Decimal,
    history: Vec<LedgerEntry>,
}

impl Account {
    pub fn new(owner_id: impl Into<OwnerId>) -> Self {
        Self {
            owner_id: owner_id.into(),
            balance: Decimal::ZERO,
            history: Vec::new(),
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn history(&self) -> &[LedgerEntry] {
        &self.history
    }

    /// Validates an entry against the current state without touching it.
    /// Only entries accepted here may be passed to [`Account::apply`].
    pub fn check_entry(&self, entry: &LedgerEntry) -> Result<(), AccountError> {
        if entry.amount <= Decimal::ZERO {
            return Err(AccountError::NonPositiveAmount {
                amount: entry.amount,
            });
        }
        let Some(balance) = self.balance.checked_add(entry.signed_amount()) else {
            return Err(AccountError::BalanceOverflow {
                owner_id: self.owner_id.clone(),
            });
        };
        if balance < Decimal::ZERO {
            return Err(AccountError::InsufficientFunds {
                owner_id: self.owner_id.clone(),
                balance: self.balance,
                requested: entry.amount,
            });
        }
        Ok(())
    }

    pub fn apply(&mut self, entry: LedgerEntry) {
        // only entries accepted by `check_entry` reach this point
        self.balance = self.balance.saturating_add(entry.signed_amount());
        self.history.push(entry);
    }
}
