//! Batch surface: CSV commands in, CSV balances out.

pub mod batch;
pub mod csv;
