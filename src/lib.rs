//! hexagram-engine - symbolic hexagram engine
//!
//! Resolves trigram pairs to King Wen hexagram ids, interprets changing
//! lines, audits selection streams for statistical bias and flags keyword
//! conflicts between two characteristic profiles.

pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod services;
