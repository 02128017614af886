//! Business logic services.

pub mod download_service;
pub mod memory_ledger;
pub mod order_ledger;
pub mod pg_ledger;
