//! # hooki-store
//!
//! Persistence for the Hooki server. The server only talks to the [`Store`]
//! trait; two backends implement it:
//!
//! - [`MemoryStore`]: process-local maps, for single-instance deployments
//!   and tests.
//! - [`SqliteStore`]: a durable SQLite file with a `user_version`-guarded
//!   migration runner.
//!
//! All operations are synchronous and complete (or fail) atomically, so a
//! caller never observes a half-written record.

pub mod blocks;
pub mod database;
pub mod matches;
pub mod memory;
pub mod messages;
pub mod migrations;
pub mod posts;
pub mod store;
pub mod users;

mod error;

pub use database::SqliteStore;
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use store::{BlockStore, ConversationStore, MatchStore, PostStore, Store, UserStore};
