//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::pagination::PaginationStrategy;
use futures::StreamExt;
use serde_json::{json, Value};
use std::io::Write;
use std::time::Instant;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let client = ApiClient::new(self.build_config()?)?;

        match &self.cli.command {
            Commands::Token => self.token(&client).await,
            Commands::Get { url, params } => self.get(&client, url, params.clone()).await,
            Commands::Pages {
                url,
                params,
                pagination_key,
                pagination_path,
                max_pages,
            } => {
                let strategy = match pagination_path {
                    Some(path) => PaginationStrategy::path(path),
                    None => PaginationStrategy::field(pagination_key),
                };
                self.pages(&client, url, params.clone(), strategy, *max_pages)
                    .await
            }
        }
    }

    /// Load the config file (if any) and apply command-line overrides
    pub fn build_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.cli.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::default(),
        };

        if let Some(auth_url) = &self.cli.auth_url {
            config.auth_url.clone_from(auth_url);
        }
        if let Some(client_id) = &self.cli.client_id {
            config.client_id.clone_from(client_id);
        }
        if let Some(client_secret) = &self.cli.client_secret {
            config.client_secret.clone_from(client_secret);
        }
        if let Some(token_type) = self.cli.token_type {
            config.token_type = token_type;
        }
        if let Some(timeout) = self.cli.timeout_seconds {
            config.retry.timeout_seconds = timeout;
        }
        if let Some(codes) = &self.cli.retry_on {
            config.retry.retry_on.clone_from(codes);
        }

        config.validate()?;
        Ok(config)
    }

    /// Acquire a token; the token itself is never printed
    async fn token(&self, client: &ApiClient) -> Result<()> {
        let credential = client.token_manager().ensure_valid_token().await?;
        let report = json!({
            "token_type": credential.token_type(),
            "expires_at": credential.expires_at().to_rfc3339(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }

    /// Print the body of the first page
    async fn get(&self, client: &ApiClient, url: &str, params: Vec<(String, String)>) -> Result<()> {
        let page = client.get(url, params).await?;
        println!("{}", page.text());
        Ok(())
    }

    /// Print every page as one compact JSON line
    async fn pages(
        &self,
        client: &ApiClient,
        url: &str,
        params: Vec<(String, String)>,
        strategy: PaginationStrategy,
        max_pages: Option<usize>,
    ) -> Result<()> {
        let start = Instant::now();
        let pages = client.paginated_get(url, params, strategy);
        let mut pages = pages.take(max_pages.unwrap_or(usize::MAX));

        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        let mut count = 0usize;

        while let Some(page) = pages.next().await {
            let page = page?;
            let body: Value = page.json_value()?;
            writeln!(out, "{}", serde_json::to_string(&body)?)?;
            count += 1;
        }
        out.flush()?;

        info!(
            "Fetched {} page(s) in {:.3}s",
            count,
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }
}
