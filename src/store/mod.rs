use thiserror::Error;

use crate::account::{Account, AccountError, LedgerEntry, OwnerId};

pub mod in_memory_store;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Account `{0}` not found")]
    NotFound(OwnerId),
    #[error("Timed out waiting for exclusive access to account `{0}`")]
    LockTimeout(OwnerId),
    #[error("Account `{0}` appears more than once in a single batch")]
    DuplicateOwner(OwnerId),
    #[error("Empty batch")]
    EmptyBatch,
    #[error(transparent)]
    AccountErr(#[from] AccountError),
}

/// An entry addressed to an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub owner_id: OwnerId,
    pub entry: LedgerEntry,
}

/// Owns every [`Account`] and is the only place balances change.
///
/// Implementations hand out value snapshots only.
pub trait AccountStore: Send + Sync {
    /// Returns the account of `owner_id`, creating an empty one if needed.
    fn open(&self, owner_id: &str) -> Result<Account, StoreError>;

    fn get(&self, owner_id: &str) -> Result<Account, StoreError>;

    /// Appends all `postings` as one unit: either every account is updated or
    /// none is. Accounts must be distinct. Snapshots are returned in the order
    /// of `postings`.
    fn apply(&self, postings: Vec<Posting>) -> Result<Vec<Account>, StoreError>;

    /// Applies the signed amount of `entry` to a single account.
    fn apply_delta(&self, owner_id: &str, entry: LedgerEntry) -> Result<Account, StoreError> {
        self.apply(vec![Posting {
            owner_id: owner_id.to_owned(),
            entry,
        }])?
        .pop()
        .ok_or(StoreError::EmptyBatch)
    }
}
