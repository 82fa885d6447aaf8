use std::io::Write;

use anyhow::Context;
use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::account::{Account, OwnerId};
use crate::query::Totals;

/// Final state of one account as printed by the script runner.
#[derive(Debug, Serialize)]
pub struct AccountSummary {
    pub owner: OwnerId,
    pub balance: Decimal,
    pub credited: Option<Decimal>,
    pub debited: Option<Decimal>,
}

impl AccountSummary {
    pub fn new(account: &Account, totals: Option<Totals>) -> Self {
        Self {
            owner: account.owner_id().to_owned(),
            balance: account.balance(),
            credited: totals.map(|t| t.total_credited),
            debited: totals.map(|t| t.total_debited),
        }
    }
}

pub fn print_summaries<W>(
    output: &mut W,
    summaries: impl IntoIterator<Item = AccountSummary>,
) -> anyhow::Result<()>
where
    W: Write,
{
    let mut writer = Writer::from_writer(output);
    for summary in summaries {
        let owner = summary.owner.clone();
        writer
            .serialize(summary)
            .with_context(|| format!("Failed to write summary of `{owner}`"))?;
    }
    writer.flush().context("Failed to flush CSV writer")
}
