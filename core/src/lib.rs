//! ClassBank core — a classroom economy simulation engine.
//!
//! A single-threaded, synchronous model: one engine owns the ledger
//! (students, jobs, transactions), the savings engine, the market
//! simulator with synthetic news, the achievement engine, and a
//! pull-based analytics layer, all persisted through a key-value
//! store. Business-rule violations are boolean results, never errors;
//! errors are reserved for persistence and serialization failures.

pub mod achievements;
pub mod activity;
pub mod analytics;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod market;
pub mod news;
pub mod rng;
pub mod savings;
pub mod store;
pub mod types;
