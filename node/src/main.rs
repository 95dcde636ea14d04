//! Lightning assets client daemon binary

use clap::{Parser, Subcommand};
use lac_core::ClientConfig;
use lac_node::NodeBuilder;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lacd")]
#[command(about = "Lightning assets client daemon")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the client daemon
    Run {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Data directory
        #[arg(long)]
        data_dir: Option<String>,

        /// API listen address
        #[arg(long)]
        api_addr: Option<String>,

        /// Address the asset server can reach this client at
        #[arg(long)]
        net_address: Option<String>,

        /// Asset server address
        #[arg(long)]
        server: Option<String>,

        /// LND REST URL
        #[arg(long)]
        lnd_url: Option<String>,

        /// LND data directory
        #[arg(long)]
        lnd_dir: Option<String>,

        /// Bitcoin network of the LND node
        #[arg(long)]
        network: Option<String>,

        /// LND admin macaroon path
        #[arg(long)]
        macaroon: Option<PathBuf>,

        /// LND TLS certificate path
        #[arg(long)]
        tls_cert: Option<PathBuf>,

        /// Price server address
        #[arg(long)]
        price_server: Option<String>,
    },

    /// Print the default configuration
    Config {
        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            data_dir,
            api_addr,
            net_address,
            server,
            lnd_url,
            lnd_dir,
            network,
            macaroon,
            tls_cert,
            price_server,
        } => {
            let base = match config {
                Some(path) => ClientConfig::load(&path)?,
                None => ClientConfig::default(),
            };

            init_logging(&base.log_level);
            info!("Starting Lightning assets client daemon...");

            let mut builder = NodeBuilder::new().config(base);
            if let Some(dir) = data_dir {
                builder = builder.data_dir(&dir);
            }
            if let Some(addr) = api_addr {
                builder = builder.api_addr(&addr);
            }
            if let Some(addr) = net_address {
                builder = builder.net_address(&addr);
            }
            if let Some(addr) = server {
                builder = builder.server_address(&addr);
            }
            if let Some(url) = lnd_url {
                builder = builder.lnd_rest_url(&url);
            }
            if let Some(dir) = lnd_dir {
                builder = builder.lnd_dir(&dir);
            }
            if let Some(network) = network {
                builder = builder.network(&network);
            }
            if let Some(path) = macaroon {
                builder = builder.macaroon_path(path);
            }
            if let Some(path) = tls_cert {
                builder = builder.tls_cert_path(path);
            }
            if let Some(addr) = price_server {
                builder = builder.price_server(&addr);
            }

            let node = builder.build()?;
            node.start().await?;
        }

        Commands::Config { output } => {
            let json = serde_json::to_string_pretty(&ClientConfig::default())?;

            match output {
                Some(path) => {
                    std::fs::write(&path, &json)?;
                    println!("Configuration saved to: {}", path.display());
                }
                None => {
                    println!("{}", json);
                }
            }
        }
    }

    Ok(())
}

/// `RUST_LOG` takes precedence over the configured level
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
