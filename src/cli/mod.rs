pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "atlas")]
#[command(about = "Atlas CLI - admin tooling for the Atlas API", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply the database schema to DATABASE_URL
    Init,
    /// Tenant management
    Tenant {
        #[command(subcommand)]
        command: commands::tenant::TenantCommands,
    },
    /// User management
    User {
        #[command(subcommand)]
        command: commands::user::UserCommands,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init => commands::init::run().await,
        Commands::Tenant { command } => commands::tenant::run(command).await,
        Commands::User { command } => commands::user::run(command).await,
    }
}
