//! Protocol Zero CLI - operator tools for the record store and storefront.
//!
//! # Usage
//!
//! ```bash
//! # Preview add-on prices for unprofitable small variants
//! pz-cli addon-pricing --dry-run
//!
//! # Write add-on prices at a 45% target margin
//! pz-cli addon-pricing --target-margin 0.45
//!
//! # Latest paid orders
//! pz-cli orders list --status paid --page-size 10
//!
//! # Clear the storefront catalog cache
//! pz-cli revalidate --url https://pzairsoft.ca --token "$REVALIDATE_TOKEN"
//! ```
//!
//! # Commands
//!
//! - `addon-pricing` - Compute and store add-on pricing
//! - `orders list` - List orders from the record store
//! - `revalidate` - Trigger catalog cache revalidation

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;

#[derive(Parser)]
#[command(name = "pz-cli")]
#[command(author, version, about = "Protocol Zero operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Price unprofitable small variants as add-ons
    AddonPricing {
        /// Print the table without writing to the record store
        #[arg(long)]
        dry_run: bool,

        /// Margin the add-on price is solved for (0.5 = 50%)
        #[arg(long, default_value = "0.5")]
        target_margin: Decimal,

        /// Most expensive supplier price (CNY) eligible for add-on pricing
        #[arg(long, default_value = "60")]
        max_cny: Decimal,
    },
    /// Inspect orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Clear the storefront's catalog cache
    Revalidate {
        /// Storefront base URL
        #[arg(long, env = "STOREFRONT_BASE_URL")]
        url: String,

        /// Revalidation bearer token
        #[arg(long, env = "REVALIDATE_TOKEN", hide_env_values = true)]
        token: String,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List orders, newest first
    List {
        /// Only orders in this status (e.g. `paid`, `ready_to_ship`)
        #[arg(short, long)]
        status: Option<String>,

        /// Number of orders to fetch
        #[arg(short, long, default_value_t = 25)]
        page_size: u32,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::AddonPricing {
            dry_run,
            target_margin,
            max_cny,
        } => {
            let options = commands::addon_pricing::Options {
                dry_run,
                target_margin,
                max_cny,
            };
            commands::addon_pricing::run(&options).await?;
        }
        Commands::Orders { action } => match action {
            OrdersAction::List { status, page_size } => {
                commands::orders::list(status.as_deref(), page_size).await?;
            }
        },
        Commands::Revalidate { url, token } => {
            commands::revalidate::trigger(&url, &token.into()).await?;
        }
    }
    Ok(())
}
