//! Core types and trait definitions for the address book.
//!
//! Parties (people and organizations), their attachments, derived keys and
//! audit timestamps. No database or I/O dependencies; the storage backend and
//! the binary both build on it.

#![allow(async_fn_in_trait)]

pub mod attachment;
pub mod card;
pub mod collection;
pub mod dates;
pub mod error;
pub mod party;
pub mod store;
pub mod text;

pub use error::{Error, IntegrityError, Result};
