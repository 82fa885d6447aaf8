/// Account balances and their append-only history.
/// Entries are validated against the account before being applied.
pub mod account;

/// Input validation for every operation, done before storage is touched.
pub mod command;

pub mod config;

/// Error taxonomy shared by all components.
pub mod error;

/// Account storage interface, plus "in memory" implementation.
/// The only place balances are written.
pub mod store;

/// Atomic movement of funds between two accounts.
pub mod transfer;

/// Money requests and their accept/reject workflow.
pub mod request;

/// Read-side filtering and totals over account history.
pub mod query;

/// Facade tying the components together; every external call goes through it.
pub mod ledger;

/// Bootstrap that replays a CSV script against an in-memory ledger. Lives in
/// the library so integration tests can use it.
pub mod bin_utils;
