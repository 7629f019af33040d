//! SecureGames - wager lifecycle and resolver service
//!
//! A bet is placed on chain, played locally against a pseudo-random round,
//! then settled exactly once by a privileged resolver that signs
//! `resolveGame` on the SecureGames contract.
//!
//! - [`session`]: the per-wager state machine driving the whole flow
//! - [`games`]: outcome generation for mines, row-climb and crash
//! - [`chain`]: contract gateway (ethers JSON-RPC or in-memory ledger)
//! - [`resolver`]: server-side settlement, live or mock
//! - [`resolution`]: client-side call into the resolver
//! - [`api`]: the resolver's HTTP surface

pub mod api;
pub mod cache;
pub mod chain;
pub mod common;
pub mod config;
pub mod errors;
pub mod games;
pub mod resolution;
pub mod resolver;
pub mod retry;
pub mod session;

pub use errors::{SecureGamesError, SecureGamesResult};
pub use session::{BetSession, SessionStatus};
