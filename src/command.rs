use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::account::OwnerId;

/// Operations understood by the script runner.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Open,
    Deposit,
    Transfer,
    Request,
    Handle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAction {
    Accept,
    Reject,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Principal is required")]
    MissingPrincipal,
    #[error("Counterpart account is required")]
    MissingCounterpart,
    #[error("Amount is required")]
    AmountRequired,
    #[error("Amount must be positive, got {amount}")]
    NonPositiveAmount { amount: Decimal },
    #[error("Source and destination accounts must differ")]
    SameAccount,
    #[error("Request id is required")]
    RequestIdRequired,
    #[error("Invalid action `{action}`, expected accept or reject")]
    InvalidAction { action: String },
}

impl FromStr for RequestAction {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accept" | "accepted" => Ok(Self::Accept),
            "reject" | "rejected" => Ok(Self::Reject),
            _ => Err(CommandError::InvalidAction {
                action: s.to_owned(),
            }),
        }
    }
}

pub fn parse_principal(principal: &str) -> Result<&str, CommandError> {
    let principal = principal.trim();
    if principal.is_empty() {
        Err(CommandError::MissingPrincipal)
    } else {
        Ok(principal)
    }
}

fn parse_counterpart(counterpart: &str) -> Result<&str, CommandError> {
    let counterpart = counterpart.trim();
    if counterpart.is_empty() {
        Err(CommandError::MissingCounterpart)
    } else {
        Ok(counterpart)
    }
}

pub fn parse_amount(amount: Option<Decimal>) -> Result<Decimal, CommandError> {
    match amount {
        Some(amount) if amount > Decimal::ZERO => Ok(amount),
        Some(amount) => Err(CommandError::NonPositiveAmount { amount }),
        None => Err(CommandError::AmountRequired),
    }
}

fn parse_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(ToOwned::to_owned)
}

/// A validated movement of funds between two distinct accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCommand {
    pub from: OwnerId,
    pub to: OwnerId,
    pub amount: Decimal,
    pub description: Option<String>,
}

impl TransferCommand {
    pub fn parse(
        from: &str,
        to: &str,
        amount: Option<Decimal>,
        description: Option<&str>,
    ) -> Result<Self, CommandError> {
        let from = parse_principal(from)?;
        let to = parse_counterpart(to)?;
        let amount = parse_amount(amount)?;
        if from == to {
            return Err(CommandError::SameAccount);
        }
        Ok(Self {
            from: from.to_owned(),
            to: to.to_owned(),
            amount,
            description: parse_description(description),
        })
    }
}

/// A validated request from `sender` asking `receiver` to pay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequestCommand {
    pub sender: OwnerId,
    pub receiver: OwnerId,
    pub amount: Decimal,
    pub description: Option<String>,
}

impl CreateRequestCommand {
    pub fn parse(
        sender: &str,
        receiver: &str,
        amount: Option<Decimal>,
        description: Option<&str>,
    ) -> Result<Self, CommandError> {
        let sender = parse_principal(sender)?;
        let receiver = parse_counterpart(receiver)?;
        let amount = parse_amount(amount)?;
        if sender == receiver {
            return Err(CommandError::SameAccount);
        }
        Ok(Self {
            sender: sender.to_owned(),
            receiver: receiver.to_owned(),
            amount,
            description: parse_description(description),
        })
    }
}
