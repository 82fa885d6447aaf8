use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use crate::{
    account::{Account, LedgerEntry},
    command::TransferCommand,
    error::LedgerError,
    store::{AccountStore, Posting, StoreError},
};

/// Post-transfer snapshots of both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub from: Account,
    pub to: Account,
}

/// The single path through which money moves between two accounts.
///
/// A transfer is one [`AccountStore::apply`] batch holding the debit of the
/// sender and the credit of the receiver, so either both legs land or neither
/// does. Not idempotent: every successful call moves funds again.
pub struct TransferEngine<S> {
    store: Arc<S>,
    retries: u32,
}

impl<S: AccountStore> TransferEngine<S> {
    pub fn new(store: Arc<S>, retries: u32) -> Self {
        Self { store, retries }
    }

    pub fn transfer(
        &self,
        from: &str,
        to: &str,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<TransferReceipt, LedgerError> {
        let command = TransferCommand::parse(from, to, Some(amount), description)?;
        self.execute(&command)
    }

    #[instrument(skip(self, command), fields(from = %command.from, to = %command.to, amount = %command.amount))]
    pub fn execute(&self, command: &TransferCommand) -> Result<TransferReceipt, LedgerError> {
        let timestamp = Utc::now();
        let postings = vec![
            Posting {
                owner_id: command.from.clone(),
                entry: LedgerEntry::debit(command.amount, command.description.clone(), timestamp),
            },
            Posting {
                owner_id: command.to.clone(),
                entry: LedgerEntry::credit(command.amount, command.description.clone(), timestamp),
            },
        ];

        let attempts = self.retries + 1;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.store.apply(postings.clone()) {
                Ok(snapshots) => {
                    let mut snapshots = snapshots.into_iter();
                    let (Some(from), Some(to)) = (snapshots.next(), snapshots.next()) else {
                        return Err(LedgerError::Internal(
                            "store returned fewer snapshots than postings".into(),
                        ));
                    };
                    info!(attempt, "transfer committed");
                    return Ok(TransferReceipt { from, to });
                }
                Err(StoreError::LockTimeout(owner_id)) if attempt < attempts => {
                    warn!(attempt, %owner_id, "account busy, retrying transfer");
                }
                Err(StoreError::LockTimeout(owner_id)) => {
                    warn!(attempt, %owner_id, "account busy, giving up");
                    return Err(LedgerError::Conflict { owner_id, attempts });
                }
                Err(err) => {
                    debug!(%err, "transfer rejected");
                    return Err(err.into());
                }
            }
        }
    }
}
