//! bookclub-rs: a self-hosted book discovery and social reading server.
//!
//! This crate provides a small HTTP API for tracking what you read,
//! discovering books through an external catalog, reviewing and rating
//! them, swapping physical copies with other users and following other
//! readers.
//!
//! # Features
//!
//! - Book search and lookup against a public volumes API
//! - User accounts and bearer-token authentication
//! - Reading progress tracking with statistics (streaks, genres,
//!   monthly counts)
//! - Yearly reading goals
//! - Favorites and a reading list
//! - Reviews with rating summaries
//! - Physical book exchange with offers, messages and transactions
//! - Follows, activity feed and notifications

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Authentication and user management.
pub mod auth;
/// External book catalog client.
pub mod catalog;
/// Configuration and CLI.
pub mod config;
/// Database operations.
pub mod db;
/// Error types.
pub mod error;
/// Physical book exchange.
pub mod exchange;
/// Favorites and reading list.
pub mod lists;
/// Reading progress tracking and goals.
pub mod progress;
/// Book reviews.
pub mod reviews;
/// HTTP server.
pub mod server;
/// Social graph and notifications.
pub mod social;
/// Reading statistics.
pub mod stats;

#[cfg(test)]
mod tests;

pub use config::{Cli, Command, Config};
pub use db::Database;
pub use error::{AppError, Result};
pub use server::AppState;
