use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::{
    account::OwnerId,
    command::{CreateRequestCommand, RequestAction, parse_principal},
    error::LedgerError,
    store::AccountStore,
    transfer::TransferEngine,
};

pub type RequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

/// A claim by `sender_id` that `receiver_id` owes them `amount`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoneyRequest {
    pub id: RequestId,
    pub sender_id: OwnerId,
    pub receiver_id: OwnerId,
    pub amount: Decimal,
    pub description: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub handled_at: Option<DateTime<Utc>>,
}

impl MoneyRequest {
    /// Moves a pending request into its terminal state.
    pub fn resolve(&mut self, action: RequestAction) -> Result<(), LedgerError> {
        if self.status != RequestStatus::Pending {
            return Err(LedgerError::AlreadyHandled(self.id));
        }
        self.status = match action {
            RequestAction::Accept => RequestStatus::Accepted,
            RequestAction::Reject => RequestStatus::Rejected,
        };
        self.handled_at = Some(Utc::now());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The principal asked for money.
    Outgoing,
    /// The principal is asked to pay.
    Incoming,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestView {
    pub request: MoneyRequest,
    pub direction: Direction,
    pub counterpart: OwnerId,
}

/// Owns every [`MoneyRequest`]; accepted requests are paid through the
/// [`TransferEngine`].
///
/// Each request has a handling lock held for the whole of `handle_request`,
/// so a request can only be paid once. Handling locks are always taken before
/// account locks. The record itself is only locked for copies and the final
/// status change, so listings never wait on a payment.
pub struct RequestWorkflow<S> {
    store: Arc<S>,
    engine: Arc<TransferEngine<S>>,
    requests: RwLock<Vec<Arc<RequestSlot>>>,
    accepted_description: String,
}

struct RequestSlot {
    handling: Mutex<()>,
    record: RwLock<MoneyRequest>,
}

impl<S: AccountStore> RequestWorkflow<S> {
    pub fn new(
        store: Arc<S>,
        engine: Arc<TransferEngine<S>>,
        accepted_description: impl Into<String>,
    ) -> Self {
        Self {
            store,
            engine,
            requests: RwLock::default(),
            accepted_description: accepted_description.into(),
        }
    }

    #[instrument(skip(self, amount, description))]
    pub fn create_request(
        &self,
        sender_id: &str,
        receiver_id: &str,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<MoneyRequest, LedgerError> {
        let command = CreateRequestCommand::parse(sender_id, receiver_id, Some(amount), description)?;
        self.store.get(&command.receiver)?;

        let mut requests = self.requests.write();
        // ids follow insertion order, so id N lives at index N - 1
        let request = MoneyRequest {
            id: requests.len() as RequestId + 1,
            sender_id: command.sender,
            receiver_id: command.receiver,
            amount: command.amount,
            description: command.description,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
            handled_at: None,
        };
        requests.push(Arc::new(RequestSlot {
            handling: Mutex::new(()),
            record: RwLock::new(request.clone()),
        }));
        info!(id = request.id, "money request created");
        Ok(request)
    }

    pub fn list_requests(&self, principal_id: &str) -> Result<Vec<RequestView>, LedgerError> {
        let principal_id = parse_principal(principal_id)?;
        let slots = self.requests.read().clone();
        let views = slots
            .iter()
            .filter_map(|slot| {
                let request = slot.record.read();
                let (direction, counterpart) = if request.sender_id == principal_id {
                    (Direction::Outgoing, request.receiver_id.clone())
                } else if request.receiver_id == principal_id {
                    (Direction::Incoming, request.sender_id.clone())
                } else {
                    return None;
                };
                Some(RequestView {
                    request: request.clone(),
                    direction,
                    counterpart,
                })
            })
            .collect();
        Ok(views)
    }

    /// Accepts or rejects a pending request addressed to `principal_id`.
    ///
    /// Unknown ids, requests addressed to someone else and requests that were
    /// already handled all fail with the same error.
    #[instrument(skip(self))]
    pub fn handle_request(
        &self,
        principal_id: &str,
        request_id: RequestId,
        action: RequestAction,
    ) -> Result<MoneyRequest, LedgerError> {
        let principal_id = parse_principal(principal_id)?;
        let slot = self.slot(request_id)?;

        let _handling = slot.handling.lock();
        let request = slot.record.read().clone();
        if request.receiver_id != principal_id || request.status != RequestStatus::Pending {
            return Err(LedgerError::RequestNotFoundOrHandled(request_id));
        }

        if action == RequestAction::Accept {
            let description = request
                .description
                .as_deref()
                .unwrap_or(&self.accepted_description);
            // the request stays pending when the payment fails
            self.engine.transfer(
                &request.receiver_id,
                &request.sender_id,
                request.amount,
                Some(description),
            )?;
        }
        let mut record = slot.record.write();
        record.resolve(action)?;
        info!(status = ?record.status, "money request handled");
        Ok(record.clone())
    }

    fn slot(&self, request_id: RequestId) -> Result<Arc<RequestSlot>, LedgerError> {
        request_id
            .checked_sub(1)
            .and_then(|idx| self.requests.read().get(idx as usize).cloned())
            .ok_or(LedgerError::RequestNotFoundOrHandled(request_id))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::{
        account::{EntryKind, LedgerEntry},
        command::CommandError,
        store::in_memory_store::InMemoryAccountStore,
    };

    use super::*;

    fn workflow_with(
        balances: &[(&str, Decimal)],
    ) -> (Arc<InMemoryAccountStore>, RequestWorkflow<InMemoryAccountStore>) {
        let store = Arc::new(InMemoryAccountStore::default());
        for (owner_id, balance) in balances {
            store.open(owner_id).unwrap();
            if *balance > Decimal::ZERO {
                store
                    .apply_delta(owner_id, LedgerEntry::credit(*balance, None, Utc::now()))
                    .unwrap();
            }
        }
        let engine = Arc::new(TransferEngine::new(store.clone(), 3));
        let workflow = RequestWorkflow::new(store.clone(), engine, "Money request accepted");
        (store, workflow)
    }

    #[test]
    fn accept_pays_the_requester_once() {
        let (store, workflow) = workflow_with(&[("s", dec!(10)), ("t", dec!(100))]);
        let request = workflow.create_request("s", "t", dec!(40), None).unwrap();
        assert_eq!(request.id, 1);
        assert_eq!(request.status, RequestStatus::Pending);

        let handled = workflow
            .handle_request("t", request.id, RequestAction::Accept)
            .unwrap();
        assert_eq!(handled.status, RequestStatus::Accepted);
        assert!(handled.handled_at.is_some());

        let sender = store.get("s").unwrap();
        let receiver = store.get("t").unwrap();
        assert_eq!(receiver.balance(), dec!(60));
        assert_eq!(sender.balance(), dec!(50));

        let credit = sender.history().last().unwrap();
        assert_eq!(credit.kind, EntryKind::Credit);
        assert_eq!(credit.amount, dec!(40));
        assert_eq!(credit.description.as_deref(), Some("Money request accepted"));
        let debit = receiver.history().last().unwrap();
        assert_eq!(debit.kind, EntryKind::Debit);
        assert_eq!(debit.amount, dec!(40));

        // a second accept is refused and moves nothing
        let err = workflow
            .handle_request("t", request.id, RequestAction::Accept)
            .unwrap_err();
        assert_eq!(err, LedgerError::RequestNotFoundOrHandled(1));
        assert_eq!(store.get("t").unwrap(), receiver);
        assert_eq!(store.get("s").unwrap(), sender);
    }

    #[test]
    fn reject_moves_no_funds() {
        let (store, workflow) = workflow_with(&[("s", dec!(10)), ("t", dec!(100))]);
        let request = workflow
            .create_request("s", "t", dec!(40), Some("dinner"))
            .unwrap();
        let handled = workflow
            .handle_request("t", request.id, RequestAction::Reject)
            .unwrap();
        assert_eq!(handled.status, RequestStatus::Rejected);
        assert_eq!(store.get("t").unwrap().balance(), dec!(100));
        assert_eq!(store.get("s").unwrap().balance(), dec!(10));

        let err = workflow
            .handle_request("t", request.id, RequestAction::Accept)
            .unwrap_err();
        assert_eq!(err, LedgerError::RequestNotFoundOrHandled(1));
    }

    #[test]
    fn only_the_receiver_may_handle() {
        let (_, workflow) = workflow_with(&[("s", dec!(0)), ("t", dec!(100)), ("x", dec!(0))]);
        let request = workflow.create_request("s", "t", dec!(40), None).unwrap();

        for principal in ["s", "x"] {
            let err = workflow
                .handle_request(principal, request.id, RequestAction::Accept)
                .unwrap_err();
            assert_eq!(err, LedgerError::RequestNotFoundOrHandled(1));
        }
        for id in [0, 2] {
            let err = workflow
                .handle_request("t", id, RequestAction::Accept)
                .unwrap_err();
            assert_eq!(err, LedgerError::RequestNotFoundOrHandled(id));
        }
    }

    #[test]
    fn failed_payment_keeps_request_pending() {
        let (store, workflow) = workflow_with(&[("s", dec!(0)), ("t", dec!(20))]);
        let request = workflow.create_request("s", "t", dec!(40), None).unwrap();

        let err = workflow
            .handle_request("t", request.id, RequestAction::Accept)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        let views = workflow.list_requests("t").unwrap();
        assert_eq!(views[0].request.status, RequestStatus::Pending);

        // topped up, the same request can now be paid
        store
            .apply_delta("t", LedgerEntry::credit(dec!(20), None, Utc::now()))
            .unwrap();
        let handled = workflow
            .handle_request("t", request.id, RequestAction::Accept)
            .unwrap();
        assert_eq!(handled.status, RequestStatus::Accepted);
        assert_eq!(store.get("t").unwrap().balance(), Decimal::ZERO);
    }

    #[test]
    fn create_request_validation() {
        let (_, workflow) = workflow_with(&[("s", dec!(0)), ("t", dec!(0))]);
        let err = workflow.create_request("s", "ghost", dec!(1), None).unwrap_err();
        assert_eq!(err, LedgerError::AccountNotFound("ghost".into()));
        let err = workflow.create_request("s", "t", dec!(0), None).unwrap_err();
        assert_eq!(
            err,
            LedgerError::Validation(CommandError::NonPositiveAmount { amount: dec!(0) })
        );
        let err = workflow.create_request("t", "t", dec!(1), None).unwrap_err();
        assert_eq!(err, LedgerError::Validation(CommandError::SameAccount));
        assert!(workflow.list_requests("s").unwrap().is_empty());
    }

    #[test]
    fn list_requests_resolves_counterpart() {
        let (_, workflow) = workflow_with(&[("s", dec!(0)), ("t", dec!(0)), ("u", dec!(0))]);
        workflow.create_request("s", "t", dec!(1), None).unwrap();
        workflow.create_request("t", "u", dec!(2), None).unwrap();
        workflow.create_request("u", "s", dec!(3), None).unwrap();

        let views = workflow.list_requests("t").unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].request.id, 1);
        assert_eq!(views[0].direction, Direction::Incoming);
        assert_eq!(views[0].counterpart, "s");
        assert_eq!(views[1].request.id, 2);
        assert_eq!(views[1].direction, Direction::Outgoing);
        assert_eq!(views[1].counterpart, "u");
    }

    #[test]
    fn listing_does_not_wait_for_handling() {
        let (_, workflow) = workflow_with(&[("s", dec!(0)), ("t", dec!(100))]);
        let request = workflow.create_request("s", "t", dec!(40), None).unwrap();

        let slot = workflow.slot(request.id).unwrap();
        let _handling = slot.handling.lock();
        let views = workflow.list_requests("t").unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].request.status, RequestStatus::Pending);
    }

    #[test]
    fn resolve_only_from_pending() {
        let (_, workflow) = workflow_with(&[("s", dec!(0)), ("t", dec!(0))]);
        let mut request = workflow.create_request("s", "t", dec!(1), None).unwrap();
        request.resolve(RequestAction::Reject).unwrap();
        assert_eq!(
            request.resolve(RequestAction::Accept).unwrap_err(),
            LedgerError::AlreadyHandled(1)
        );
        assert_eq!(request.status, RequestStatus::Rejected);
    }
}
