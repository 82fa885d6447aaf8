//! Drives a [`Ledger`] from a CSV script, standing in for the transport layer
//! that would normally sit in front of it. Kept in the library so integration
//! tests can run it.

use std::io::{Read, Write};

use anyhow::Result;
use csv_parser::{CsvScriptParser, ScriptRow};
use csv_printer::{AccountSummary, print_summaries};
use thiserror::Error;
use tracing::debug;

use crate::{
    command::{CommandError, Operation, RequestAction},
    config::LedgerConfig,
    error::LedgerError,
    ledger::Ledger,
    store::in_memory_store::InMemoryAccountStore,
};

pub mod csv_parser;
pub mod csv_printer;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Malformed row: {0}")]
    Parse(#[from] csv::Error),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub struct Service<'w, R, W: 'w> {
    pub input: R,
    pub output: &'w mut W,
    pub config: LedgerConfig,
    pub error_printer: Box<dyn FnMut(u64, ScriptError)>,
}

impl<'w, R, W> Service<'w, R, W>
where
    R: Read,
    W: Write + 'w,
{
    pub fn run(mut self) -> Result<()> {
        let parser = CsvScriptParser::new(self.input);
        let ledger = Ledger::in_memory(&self.config);

        let mut last_line = 0;
        for (line, row) in parser {
            last_line = line;
            let outcome = row
                .map_err(ScriptError::from)
                .and_then(|row| execute(&ledger, row).map_err(ScriptError::from));
            if let Err(err) = outcome {
                (self.error_printer)(line, err);
            }
        }

        let summaries = summarize(&ledger, |err| (self.error_printer)(last_line, err.into()));
        print_summaries(self.output, summaries)
    }
}

/// One summary per account. An account whose totals cannot be computed is
/// still listed, without totals, and the error is reported.
fn summarize(
    ledger: &Ledger<InMemoryAccountStore>,
    mut report: impl FnMut(LedgerError),
) -> Vec<AccountSummary> {
    ledger
        .store()
        .snapshot_all()
        .iter()
        .map(|account| {
            let totals = ledger
                .totals(account.owner_id())
                .map_err(&mut report)
                .ok();
            AccountSummary::new(account, totals)
        })
        .collect()
}

fn execute(ledger: &Ledger<InMemoryAccountStore>, row: ScriptRow) -> Result<(), LedgerError> {
    debug!(?row, "executing script row");
    let counterpart = row.counterpart.as_deref().unwrap_or_default();
    let description = row.description.as_deref();
    match row.op {
        Operation::Open => {
            ledger.open_account(&row.principal)?;
        }
        Operation::Deposit => {
            let amount = row.amount.ok_or(CommandError::AmountRequired)?;
            ledger.deposit(&row.principal, amount, description)?;
        }
        Operation::Transfer => {
            let amount = row.amount.ok_or(CommandError::AmountRequired)?;
            ledger.transfer(&row.principal, counterpart, amount, description)?;
        }
        Operation::Request => {
            let amount = row.amount.ok_or(CommandError::AmountRequired)?;
            ledger.create_request(&row.principal, counterpart, amount, description)?;
        }
        Operation::Handle => {
            let request_id = row.request.ok_or(CommandError::RequestIdRequired)?;
            let action = row.action.as_deref().unwrap_or_default().parse::<RequestAction>()?;
            ledger.handle_request(&row.principal, request_id, action)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn summaries_survive_overflowing_totals() {
        let ledger = Ledger::in_memory(&LedgerConfig::default());
        for owner in ["a", "b"] {
            ledger.open_account(owner).unwrap();
        }
        ledger.deposit("a", Decimal::MAX, None).unwrap();
        ledger.transfer("a", "b", Decimal::MAX, None).unwrap();
        ledger.deposit("a", dec!(1), None).unwrap();

        let mut errors = Vec::new();
        let summaries = summarize(&ledger, |err| errors.push(err));

        assert_eq!(
            errors,
            vec![LedgerError::AmountOverflow {
                owner_id: "a".into()
            }]
        );
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].owner, "a");
        assert_eq!(summaries[0].balance, dec!(1));
        assert_eq!(summaries[0].credited, None);
        assert_eq!(summaries[1].owner, "b");
        assert_eq!(summaries[1].credited, Some(Decimal::MAX));
        assert_eq!(summaries[1].debited, Some(Decimal::ZERO));
    }
}
