//! GarageHub CLI - session-store migration and delivery fee tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the storefront session table
//! garagehub migrate
//!
//! # Print the delivery fee table
//! garagehub fees
//!
//! # Quote delivery for a region
//! garagehub fees --region kandy --subtotal 12500
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;

#[derive(Parser)]
#[command(name = "garagehub")]
#[command(author, version, about = "GarageHub CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the storefront session table
    Migrate,
    /// Show delivery fees
    Fees {
        /// Quote a single region instead of printing the table
        #[arg(short, long)]
        region: Option<String>,

        /// Order subtotal in rupees, used with --region
        #[arg(short, long, default_value = "0")]
        subtotal: Decimal,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

#[allow(clippy::print_stdout)]
async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::sessions().await?,
        Commands::Fees { region, subtotal } => match region {
            Some(region) => print!("{}", commands::fees::quote(&region, subtotal)),
            None => print!("{}", commands::fees::table()),
        },
    }
    Ok(())
}
