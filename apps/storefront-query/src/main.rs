mod file_store;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use storefront_client::{
    CallerContext, Document, HeaderMap, MemorySessionStorage, SessionStorage, StorefrontClient,
    StorefrontClientConfig,
};
use tracing_subscriber::EnvFilter;

use crate::file_store::FileSessionStorage;

/// Send a GraphQL operation to a Vendure shop API.
///
/// Prints the `data` of the response on stdout. Session cookies issued
/// along the way are printed on stderr as `Set-Cookie:` lines; pass them
/// back with `--cookie` together with `--session-file` to stay logged in.
#[derive(Parser, Debug)]
#[command(name = "storefront-query", version)]
struct Cli {
    /// Operation text, or `@path` to read it from a file
    query: String,

    /// Shop API endpoint
    #[arg(long, env = "VENDURE_API_URL")]
    endpoint: Option<String>,

    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Raw `Cookie` header of the caller
    #[arg(long)]
    cookie: Option<String>,

    /// Variables as a JSON object
    #[arg(long)]
    variables: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Persist sessions in this JSON file instead of in memory
    #[arg(long)]
    session_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = StorefrontClientConfig::load_with(cli.config.as_deref(), cli.endpoint.clone())
        .context("failed to load storefront configuration")?;
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    let sessions: Arc<dyn SessionStorage> = match &cli.session_file {
        Some(path) => Arc::new(FileSessionStorage::new(path)),
        None => Arc::new(MemorySessionStorage::new()),
    };
    let client = StorefrontClient::new(config, sessions).context("failed to build client")?;

    let query = read_query(&cli.query).await?;
    let variables = cli
        .variables
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .context("--variables is not valid JSON")?;
    let context = cli.cookie.clone().map(CallerContext::with_cookie);

    tracing::info!(api_url = %client.config().api_url, "sending query");
    let result = client
        .send::<serde_json::Value>(&Document::new(query), variables, context.as_ref())
        .await;

    match result {
        Ok(result) => {
            print_set_cookies(&result.headers);
            println!("{}", serde_json::to_string_pretty(&result.value)?);
            Ok(())
        }
        Err(err) => {
            if let Some(headers) = err.relay_headers() {
                print_set_cookies(headers);
            }
            Err(err).context("shop API request failed")
        }
    }
}

fn print_set_cookies(headers: &HeaderMap) {
    for cookie in headers.get_all("set-cookie") {
        eprintln!("Set-Cookie: {}", cookie.to_str().unwrap_or("<binary>"));
    }
}

async fn read_query(arg: &str) -> Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read query file {path}")),
        None => Ok(arg.to_owned()),
    }
}
