use std::{collections::HashMap, sync::Arc, time::Duration};

use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::{debug, trace};

use crate::{
    account::{Account, OwnerId},
    config::LedgerConfig,
};

use super::{AccountStore, Posting, StoreError};

type AccountHandle = Arc<Mutex<Account>>;

/// Keeps accounts in memory, one lock per account.
///
/// The owner index is only locked long enough to clone handles, so mutations
/// of unrelated accounts never wait on each other.
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<OwnerId, AccountHandle>>,
    lock_timeout: Duration,
}

impl InMemoryAccountStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            accounts: RwLock::default(),
            lock_timeout,
        }
    }

    /// Snapshots of all accounts, sorted by owner.
    pub fn snapshot_all(&self) -> Vec<Account> {
        let mut handles: Vec<(OwnerId, AccountHandle)> = self
            .accounts
            .read()
            .iter()
            .map(|(owner_id, handle)| (owner_id.clone(), handle.clone()))
            .collect();
        handles.sort_by(|(a, _), (b, _)| a.cmp(b));
        handles
            .into_iter()
            .map(|(_, handle)| handle.lock().clone())
            .collect()
    }

    fn handle(&self, owner_id: &str) -> Result<AccountHandle, StoreError> {
        self.accounts
            .read()
            .get(owner_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(owner_id.to_owned()))
    }

    fn lock<'a>(
        &self,
        owner_id: &str,
        handle: &'a AccountHandle,
    ) -> Result<MutexGuard<'a, Account>, StoreError> {
        handle
            .try_lock_for(self.lock_timeout)
            .ok_or_else(|| StoreError::LockTimeout(owner_id.to_owned()))
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new(LedgerConfig::default().lock_timeout)
    }
}

impl AccountStore for InMemoryAccountStore {
    fn open(&self, owner_id: &str) -> Result<Account, StoreError> {
        let handle = match self.handle(owner_id) {
            Ok(handle) => handle,
            Err(_) => self
                .accounts
                .write()
                .entry(owner_id.to_owned())
                .or_insert_with(|| {
                    debug!(owner_id, "opening account");
                    Arc::new(Mutex::new(Account::new(owner_id)))
                })
                .clone(),
        };
        let account = self.lock(owner_id, &handle)?;
        Ok(account.clone())
    }

    fn get(&self, owner_id: &str) -> Result<Account, StoreError> {
        let handle = self.handle(owner_id)?;
        let account = self.lock(owner_id, &handle)?;
        Ok(account.clone())
    }

    fn apply(&self, postings: Vec<Posting>) -> Result<Vec<Account>, StoreError> {
        if postings.is_empty() {
            return Err(StoreError::EmptyBatch);
        }

        // locks are always taken in ascending owner order
        let mut order: Vec<usize> = (0..postings.len()).collect();
        order.sort_by(|&a, &b| postings[a].owner_id.cmp(&postings[b].owner_id));
        for pair in order.windows(2) {
            if postings[pair[0]].owner_id == postings[pair[1]].owner_id {
                return Err(StoreError::DuplicateOwner(
                    postings[pair[0]].owner_id.clone(),
                ));
            }
        }

        let handles = order
            .iter()
            .map(|&idx| self.handle(&postings[idx].owner_id))
            .collect::<Result<Vec<_>, _>>()?;

        let mut guards = Vec::with_capacity(handles.len());
        for (&idx, handle) in order.iter().zip(&handles) {
            guards.push(self.lock(&postings[idx].owner_id, handle)?);
        }

        // nothing is written until every posting is known to be valid
        for (&idx, guard) in order.iter().zip(&guards) {
            guard.check_entry(&postings[idx].entry)?;
        }

        let mut snapshots: Vec<Option<Account>> = vec![None; postings.len()];
        let mut postings: Vec<Option<Posting>> = postings.into_iter().map(Some).collect();
        for (&idx, guard) in order.iter().zip(guards.iter_mut()) {
            if let Some(posting) = postings[idx].take() {
                trace!(
                    owner_id = %posting.owner_id,
                    delta = %posting.entry.signed_amount(),
                    "appending entry"
                );
                guard.apply(posting.entry);
            }
            snapshots[idx] = Some(Account::clone(guard));
        }
        Ok(snapshots.into_iter().flatten().collect())
    }
}
