// SPDX-License-Identifier: AGPL-3.0-or-later

use std::convert::TryFrom;
use std::convert::TryInto;

use anyhow::Result;
use clap::Parser;
use tablegraph::{Configuration, Node};

#[derive(Parser, Debug)]
#[command(name = "tablegraph Node", version)]
/// Node serving tenant tables as a derived GraphQL API.
struct Cli {
    /// URL / connection string to the PostgreSQL database holding the tenant tables.
    #[arg(short, long)]
    database_url: Option<String>,

    /// Maximum number of connections the database pool should maintain, 32 by default.
    #[arg(long)]
    database_max_connections: Option<u32>,

    /// Port for the http server, 3000 by default.
    #[arg(short = 'P', long)]
    http_port: Option<u16>,

    /// Directory holding one sub-directory per tenant with its schema.graphql document.
    #[arg(short, long)]
    schema_dir: Option<std::path::PathBuf>,

    /// Directory the /logs route reads NDJSON log files from.
    #[arg(short, long)]
    log_dir: Option<std::path::PathBuf>,

    /// Seconds a cached query result stays valid, 60 by default.
    #[arg(long)]
    cache_ttl: Option<u64>,
}

impl TryFrom<Cli> for Configuration {
    type Error = anyhow::Error;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let mut config = Configuration::default();

        if let Some(database_url) = cli.database_url {
            config.database_url = database_url;
        }
        if let Some(max_connections) = cli.database_max_connections {
            config.database_max_connections = max_connections;
        }
        if let Some(http_port) = cli.http_port {
            config.http_port = http_port;
        }
        if let Some(schema_dir) = cli.schema_dir {
            config.schema_base_path = schema_dir;
        }
        if let Some(log_dir) = cli.log_dir {
            config.log_dir = log_dir;
        }
        if let Some(cache_ttl) = cli.cache_ttl {
            config.cache_ttl = cache_ttl;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration parameters and apply defaults
    let config: Configuration = cli.try_into().expect("Could not load configuration");

    // Start tablegraph node in async runtime
    let node = Node::start(config).await;

    // Run this until [CTRL] + [C] got pressed or something went wrong
    tokio::select! {
        _ = tokio::signal::ctrl_c() => (),
        _ = node.on_exit() => (),
    }

    // Wait until all tasks are gracefully shut down and exit
    node.shutdown().await;
}
