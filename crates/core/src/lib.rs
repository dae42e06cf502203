//! Core business logic for agora.
//!
//! Comment threading, the vote ledger, and the post, comment and user
//! services built on top of the repositories in `agora-db`.

pub mod services;

pub use services::*;
