//! Guildhall Store - SQLite persistence
//!
//! This crate provides a durable backend for the guild economy:
//! - `SqliteStore`: implements every repository trait of `guildhall-core`
//! - Schema creation on open, so a fresh path yields a ready database
//! - Atomic ledger writes: balance update, log append and escrow state
//!   change commit together or not at all

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
mod rows;
pub mod sqlite;

pub use error::{Result, StoreError};
pub use sqlite::SqliteStore;
