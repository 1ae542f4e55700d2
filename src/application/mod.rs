//! Application layer: the services that read and change the ledger.
//!
//! Every balance-sensitive write runs as snapshot, decide, commit against the
//! snapshot's version, re-run under `RetryPolicy` when another writer got
//! there first. `CustodyEngine` composes the services over one set of stores.

pub mod accounts;
pub mod engine;
pub mod identity;
pub mod ledger;
pub mod retry;
pub mod settlement;
pub mod status_registry;
pub mod withdrawals;
