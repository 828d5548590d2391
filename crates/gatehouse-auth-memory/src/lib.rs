//! # gatehouse-auth-memory
//!
//! In-memory implementations of the Gatehouse storage traits.
//!
//! This backend serves development, testing, and single-process
//! deployments. Records live in `RwLock`-guarded maps keyed the same way
//! a relational backend would index them (code value, token digest).
//!
//! The authorization-code consume runs its check-and-mark under one write
//! guard, which gives the same exactly-once guarantee a conditional
//! `UPDATE ... WHERE consumed_at IS NULL` provides in SQL.

pub mod client;
pub mod code;
pub mod subject;
pub mod token;

pub use client::MemoryClientStore;
pub use code::MemoryCodeStore;
pub use subject::MemorySubjectStore;
pub use token::{MemoryAccessTokenStore, MemoryRefreshTokenStore};
