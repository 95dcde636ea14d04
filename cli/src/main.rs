//! laccli - command line client for the Lightning assets daemon

use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use lac_cli::{format_contract, format_quote, ApiClient};
use lac_core::ContractType;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "laccli")]
#[command(about = "Control the Lightning assets client daemon")]
#[command(version)]
struct Cli {
    /// Daemon API URL
    #[arg(short, long, default_value = "http://127.0.0.1:8081")]
    daemon: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "120")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a new contract with a Lightning asset server
    Opencontract {
        /// Asset to denominate the contract in, USD or NOK
        #[arg(long)]
        asset: String,

        /// Amount denominated in the asset
        #[arg(long)]
        amount: f64,

        /// Contract type, FUNDED or UNFUNDED
        #[arg(long = "type")]
        contract_type: ContractType,

        /// Accept the quoted terms without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Close a contract
    Closecontract {
        /// Contract id
        #[arg(long)]
        id: String,
    },

    /// List all contracts
    Listcontracts,

    /// Create a payment request
    Payreq {
        /// Amount in sats
        #[arg(long)]
        amount: u64,
    },

    /// Pay a payment request
    Pay {
        /// Payment request to pay
        #[arg(long)]
        payreq: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let api_client = ApiClient::new(&cli.daemon, Duration::from_secs(cli.timeout))?;

    match cli.command {
        Commands::Opencontract {
            asset,
            amount,
            contract_type,
            yes,
        } => {
            let created = api_client
                .create_contract(&asset, amount, contract_type)
                .await
                .map_err(|e| anyhow::anyhow!("could not create contract: {}", e))?;

            println!("{}", format_quote(&created));

            let accepted = yes
                || Confirm::new()
                    .with_prompt("Continue opening contract?")
                    .default(false)
                    .interact()?;
            if !accepted {
                println!("{}", "Opening contract canceled".yellow());
                anyhow::bail!("user did not accept terms for contract {}", created.contract.id);
            }

            let spinner = ProgressBar::new_spinner();
            spinner.set_style(ProgressStyle::default_spinner());
            spinner.set_message("Paying invoices...");
            spinner.enable_steady_tick(Duration::from_millis(100));

            let result = api_client.open_contract(created.contract.id.as_str()).await;
            spinner.finish_and_clear();

            match result {
                Ok(contract) => {
                    println!("{}", "✅ Contract opened!".green());
                    println!("{}", format_contract(&contract));
                }
                Err(e) => {
                    eprintln!("{} {}", "❌ Could not open contract:".red(), e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Closecontract { id } => match api_client.close_contract(&id).await {
            Ok(()) => println!("{} {}", "✅ Closed contract".green(), id),
            Err(e) => {
                eprintln!("{} {}", "❌ Could not close contract:".red(), e);
                std::process::exit(1);
            }
        },

        Commands::Listcontracts => {
            let contracts = api_client.list_contracts().await?;

            if contracts.is_empty() {
                println!("No contracts found.");
            } else {
                println!(
                    "{:<36} {:>12} {:<5} {:<9} {:>10} {:>12} {}",
                    "Id", "Amount", "Asset", "Type", "Margin", "Init", "Status"
                );
                println!("{:-<36} {:-<12} {:-<5} {:-<9} {:-<10} {:-<12} {:-<6}", "", "", "", "", "", "", "");
                for contract in &contracts {
                    println!("{}", format_contract(contract));
                }
            }
        }

        Commands::Payreq { amount } => {
            let pay_req = api_client.payment_request(amount).await?;
            println!("{}", pay_req);
        }

        Commands::Pay { payreq } => match api_client.pay(&payreq).await {
            Ok(()) => println!("{}", "✅ Paid".green()),
            Err(e) => {
                eprintln!("{} {}", "❌ Payment failed:".red(), e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
