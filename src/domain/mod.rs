//! Domain layer: value objects, entities, the derived balance and the ports
//! the application layer depends on.

pub mod account;
pub mod buy_request;
pub mod ids;
pub mod ledger;
pub mod money;
pub mod payment;
pub mod ports;
pub mod status;
pub mod transaction;
pub mod withdrawal;
