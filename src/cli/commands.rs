//! CLI commands and argument parsing

use crate::types::TokenType;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Authenticated REST client for Open edX style APIs
#[derive(Parser, Debug)]
#[command(name = "edx-api-client")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML or JSON, optionally under an `edx-rest-api` section)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Token endpoint URL
    #[arg(long, global = true, env = "EDX_AUTH_URL")]
    pub auth_url: Option<String>,

    /// OAuth2 client id
    #[arg(long, global = true, env = "EDX_CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth2 client secret
    #[arg(long, global = true, env = "EDX_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Token type to request
    #[arg(long, global = true, env = "EDX_TOKEN_TYPE", value_parser = parse_token_type)]
    pub token_type: Option<TokenType>,

    /// Retry window per page, in seconds
    #[arg(long, global = true)]
    pub timeout_seconds: Option<u64>,

    /// Status codes to retry (comma-separated)
    #[arg(long, global = true, value_delimiter = ',')]
    pub retry_on: Option<Vec<u16>>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Acquire an access token and report its type and expiry
    Token,

    /// Fetch a single page and print its body
    Get {
        /// Resource URL
        url: String,

        /// Query parameter as key=value (repeatable)
        #[arg(short, long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },

    /// Fetch every page and print each body as a JSON line
    Pages {
        /// Resource URL
        url: String,

        /// Query parameter for the first page as key=value (repeatable)
        #[arg(short, long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,

        /// Top-level field holding the next page URL
        #[arg(long, default_value = "next", conflicts_with = "pagination_path")]
        pagination_key: String,

        /// Dotted path to the next page URL (e.g. pagination.next)
        #[arg(long)]
        pagination_path: Option<String>,

        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<usize>,
    },
}

/// Parse a `key=value` pair
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid key=value pair: no '=' in '{s}'"))?;
    if key.is_empty() {
        return Err(format!("invalid key=value pair: empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_token_type(s: &str) -> Result<TokenType, String> {
    s.parse()
}
