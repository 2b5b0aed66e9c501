//! Cloud Retail CLI - Database migrations and account management.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! retail-cli migrate storefront
//!
//! # Run storage database migrations
//! retail-cli migrate storage
//!
//! # Run all database migrations
//! retail-cli migrate all
//!
//! # Create an admin account
//! retail-cli user create -u admin -e admin@example.com -p 'changeme123' -r admin
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` - Create storefront accounts

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "retail-cli")]
#[command(author, version, about = "Cloud Retail CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Manage storefront accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Run storefront database migrations (users, carts, orders, sessions)
    Storefront,
    /// Run storage database migrations (tables, blobs, queue, file share)
    Storage,
    /// Run all database migrations
    All,
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new account
    Create {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password
        #[arg(short, long)]
        password: String,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,

        /// Account role (`admin`, `customer`)
        #[arg(short, long, default_value = "customer")]
        role: String,
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

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { target } => match target {
            MigrateTarget::Storefront => commands::migrate::storefront().await?,
            MigrateTarget::Storage => commands::migrate::storage().await?,
            MigrateTarget::All => {
                commands::migrate::storefront().await?;
                commands::migrate::storage().await?;
            }
        },
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                email,
                password,
                name,
                role,
            } => {
                commands::user::create(&username, &email, &password, name.as_deref(), &role)
                    .await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_user_create_with_default_role() {
        let cli = Cli::try_parse_from([
            "retail-cli", "user", "create", "-u", "ada", "-e", "ada@example.com", "-p", "secret123",
        ]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::User {
                action: UserAction::Create { ref role, .. }
            }) if role == "customer"
        ));
    }
}
