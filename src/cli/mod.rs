//! CLI module
//!
//! Command-line interface for the API client.
//!
//! # Commands
//!
//! - `token` - Acquire an access token and show its expiry
//! - `get` - Fetch a single page
//! - `pages` - Follow pagination and print every page

mod commands;
mod runner;

pub use commands::{parse_key_val, Cli, Commands};
pub use runner::Runner;
