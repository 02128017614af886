//! Domain models.

pub mod order;

pub use order::{DownloadEntry, Order, OrderItem};
