//! # hooki-shared
//!
//! Types shared by the Hooki store and server crates: identifiers, domain
//! models, the realtime wire protocol, geo helpers and the error taxonomy.

pub mod constants;
pub mod error;
pub mod events;
pub mod geo;
pub mod models;
pub mod types;

pub use error::HookiError;
