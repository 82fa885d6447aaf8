use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::{
    account::{Account, LedgerEntry},
    command::{RequestAction, parse_amount, parse_principal},
    config::LedgerConfig,
    error::LedgerError,
    query::{LedgerQuery, Totals},
    request::{MoneyRequest, RequestId, RequestView, RequestWorkflow},
    store::{AccountStore, in_memory_store::InMemoryAccountStore},
    transfer::{TransferEngine, TransferReceipt},
};

/// Entry point for every external call.
///
/// Each operation takes the caller's identity as an already verified
/// principal and returns a structured error on failure.
pub struct Ledger<S> {
    store: Arc<S>,
    engine: Arc<TransferEngine<S>>,
    requests: RequestWorkflow<S>,
    query: LedgerQuery<S>,
}

impl Ledger<InMemoryAccountStore> {
    pub fn in_memory(config: &LedgerConfig) -> Self {
        Self::new(
            Arc::new(InMemoryAccountStore::new(config.lock_timeout)),
            config,
        )
    }
}

impl<S: AccountStore> Ledger<S> {
    pub fn new(store: Arc<S>, config: &LedgerConfig) -> Self {
        let engine = Arc::new(TransferEngine::new(store.clone(), config.transfer_retries));
        Self {
            requests: RequestWorkflow::new(
                store.clone(),
                engine.clone(),
                config.accepted_request_description.clone(),
            ),
            query: LedgerQuery::new(store.clone()),
            engine,
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn open_account(&self, principal: &str) -> Result<Account, LedgerError> {
        let principal = parse_principal(principal)?;
        Ok(self.store.open(principal)?)
    }

    /// Funds an account from outside the ledger.
    #[instrument(skip(self, description))]
    pub fn deposit(
        &self,
        principal: &str,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<Account, LedgerError> {
        let principal = parse_principal(principal)?;
        let amount = parse_amount(Some(amount))?;
        let entry = LedgerEntry::credit(amount, description.map(ToOwned::to_owned), Utc::now());
        let account = self.store.apply_delta(principal, entry)?;
        info!(balance = %account.balance(), "deposit committed");
        Ok(account)
    }

    pub fn account(&self, principal: &str) -> Result<Account, LedgerError> {
        let principal = parse_principal(principal)?;
        Ok(self.store.get(principal)?)
    }

    pub fn balance(&self, principal: &str) -> Result<Decimal, LedgerError> {
        self.account(principal).map(|account| account.balance())
    }

    pub fn transfer(
        &self,
        principal: &str,
        to: &str,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<TransferReceipt, LedgerError> {
        self.engine.transfer(principal, to, amount, description)
    }

    pub fn create_request(
        &self,
        principal: &str,
        receiver_id: &str,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<MoneyRequest, LedgerError> {
        self.requests
            .create_request(principal, receiver_id, amount, description)
    }

    pub fn list_requests(&self, principal: &str) -> Result<Vec<RequestView>, LedgerError> {
        self.requests.list_requests(principal)
    }

    pub fn handle_request(
        &self,
        principal: &str,
        request_id: RequestId,
        action: RequestAction,
    ) -> Result<MoneyRequest, LedgerError> {
        self.requests.handle_request(principal, request_id, action)
    }

    pub fn credit_history(&self, principal: &str) -> Result<Vec<LedgerEntry>, LedgerError> {
        let principal = parse_principal(principal)?;
        self.query.credit_entries(principal)
    }

    pub fn debit_history(&self, principal: &str) -> Result<Vec<LedgerEntry>, LedgerError> {
        let principal = parse_principal(principal)?;
        self.query.debit_entries(principal)
    }

    pub fn totals(&self, principal: &str) -> Result<Totals, LedgerError> {
        let principal = parse_principal(principal)?;
        self.query.totals(principal)
    }
}
