use std::fs::File;

use anyhow::{Context, Result};
use peer_ledger::{
    bin_utils::{ScriptError, Service},
    config::LedgerConfig,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let filename = std::env::args()
        .nth(1)
        .context("Expected a script file name as the first argument")?;
    let file = File::open(&filename).with_context(|| format!("Failed to open `{filename}`"))?;
    let config = LedgerConfig::from_env()?;

    let service = Service {
        input: file,
        output: &mut std::io::stdout(),
        config,
        error_printer: Box::new(|line, err| match err {
            ScriptError::Parse(err) => eprintln!("Error at line {line}: {err}"),
            ScriptError::Ledger(err) => {
                let failure = err.failure();
                eprintln!(
                    "Rejected at line {line}: [{:?}/{}] {}",
                    failure.kind, failure.status, failure.message
                )
            }
        }),
    };
    service.run()
}
