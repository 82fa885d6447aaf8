use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    account::{AccountError, OwnerId},
    command::CommandError,
    request::RequestId,
    store::StoreError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientFunds,
    AlreadyHandled,
    Conflict,
    Internal,
}

/// Structured outcome handed to whatever transport sits in front of the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: ErrorKind,
    pub status: u16,
    pub message: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] CommandError),
    #[error("Account `{0}` not found")]
    AccountNotFound(OwnerId),
    #[error("Money request {0} not found or already handled")]
    RequestNotFoundOrHandled(RequestId),
    #[error("Money request {0} has already been handled")]
    AlreadyHandled(RequestId),
    #[error("Insufficient funds in account `{owner_id}`: balance {balance}, requested {requested}")]
    InsufficientFunds {
        owner_id: OwnerId,
        balance: Decimal,
        requested: Decimal,
    },
    #[error("Amount overflow in account `{owner_id}`")]
    AmountOverflow { owner_id: OwnerId },
    #[error("Concurrent mutation of account `{owner_id}`, gave up after {attempts} attempts")]
    Conflict { owner_id: OwnerId, attempts: u32 },
    #[error("Internal ledger error: {0}")]
    Internal(String),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::AmountOverflow { .. } => ErrorKind::Validation,
            Self::AccountNotFound(_) | Self::RequestNotFoundOrHandled(_) => ErrorKind::NotFound,
            Self::AlreadyHandled(_) => ErrorKind::AlreadyHandled,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP-style status a transport would answer with.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::InsufficientFunds => 400,
            ErrorKind::NotFound | ErrorKind::AlreadyHandled => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
        }
    }

    /// Only these leave storage untouched and may succeed when repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Conflict | ErrorKind::Internal)
    }

    pub fn failure(&self) -> Failure {
        Failure {
            kind: self.kind(),
            status: self.status_code(),
            message: self.to_string(),
        }
    }
}

impl From<AccountError> for LedgerError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::NonPositiveAmount { amount } => {
                Self::Validation(CommandError::NonPositiveAmount { amount })
            }
            AccountError::InsufficientFunds {
                owner_id,
                balance,
                requested,
            } => Self::InsufficientFunds {
                owner_id,
                balance,
                requested,
            },
            AccountError::BalanceOverflow { owner_id } => Self::AmountOverflow { owner_id },
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(owner_id) => Self::AccountNotFound(owner_id),
            StoreError::AccountErr(err) => err.into(),
            StoreError::LockTimeout(owner_id) => Self::Conflict {
                owner_id,
                attempts: 1,
            },
            err @ (StoreError::DuplicateOwner(_) | StoreError::EmptyBatch) => {
                Self::Internal(err.to_string())
            }
        }
    }
}
