//! Common test utilities for download-flow and integration tests.

#![allow(dead_code)]

pub mod fixtures;

/// Generate a unique test identifier
pub fn test_id() -> String {
    format!("test_{}", uuid::Uuid::new_v4().simple())
}
