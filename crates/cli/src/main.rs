//! dMarketplace CLI - Database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! dm-cli migrate
//!
//! # Review merchant applications
//! dm-cli merchant pending
//! dm-cli merchant approve 12
//! dm-cli merchant reject 12 --reason "KYB document is unreadable"
//!
//! # Issue bearer tokens
//! dm-cli token admin
//! dm-cli token merchant 12
//!
//! # Hash the admin password (reads stdin)
//! echo -n 'long admin passphrase' | dm-cli hash-password
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "dm-cli")]
#[command(author, version, about = "dMarketplace CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Review merchant applications
    Merchant {
        #[command(subcommand)]
        action: MerchantAction,
    },
    /// Issue a bearer token
    Token {
        #[command(subcommand)]
        role: TokenRole,
    },
    /// Hash a password read from stdin for `MARKETPLACE_ADMIN_PASSWORD_HASH`
    HashPassword,
}

#[derive(Subcommand)]
enum MerchantAction {
    /// List applications waiting for review
    Pending,
    /// Approve an application
    Approve {
        /// Seller ID
        id: i32,

        /// Override an already decided application
        #[arg(long)]
        force: bool,
    },
    /// Reject an application
    Reject {
        /// Seller ID
        id: i32,

        /// Reason shown to the merchant
        #[arg(short, long)]
        reason: String,

        /// Override an already decided application
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum TokenRole {
    /// Token for the admin dashboard
    Admin,
    /// Token for one merchant's dashboard
    Merchant {
        /// Seller ID
        seller_id: i32,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Merchant { action } => match action {
            MerchantAction::Pending => commands::merchant::pending().await?,
            MerchantAction::Approve { id, force } => {
                commands::merchant::approve(id, force).await?;
            }
            MerchantAction::Reject { id, reason, force } => {
                commands::merchant::reject(id, &reason, force).await?;
            }
        },
        Commands::Token { role } => match role {
            TokenRole::Admin => commands::token::admin()?,
            TokenRole::Merchant { seller_id } => commands::token::merchant(seller_id)?,
        },
        Commands::HashPassword => commands::password::hash_from_stdin()?,
    }
    Ok(())
}
