//! Photo Vault - Backend Library
//!
//! Order ledger and download-access-control service: redeems one-time
//! download codes and mints short-lived signed URLs for purchased images.

#[macro_use]
mod macros;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod telemetry;

pub use config::Config;
pub use error::{AppError, Result};
