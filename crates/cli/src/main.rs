//! LTE Admin CLI - database migrations and admin user management.
//!
//! # Usage
//!
//! ```bash
//! # Run admin database migrations
//! lte-cli migrate
//!
//! # Create admin user (password from LTE_ADMIN_PASSWORD)
//! lte-cli admin create -e admin@example.com -n "Admin Name" --superuser
//!
//! # Grant a permission
//! lte-cli admin grant -e admin@example.com -p blog.change_article
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "lte-cli")]
#[command(author, version, about = "LTE Admin CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Grant every permission
        #[arg(long)]
        superuser: bool,

        /// Create without admin site access
        #[arg(long)]
        no_staff: bool,
    },
    /// Grant a permission codename to an admin user
    Grant {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Permission codename, e.g. `blog.change_article`
        #[arg(short, long)]
        permission: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                superuser,
                no_staff,
            } => {
                commands::admin::create_user(&email, &name, superuser, !no_staff).await?;
            }
            AdminAction::Grant { email, permission } => {
                commands::admin::grant_permission(&email, &permission).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::Cli;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }
}
