use anyhow::{bail, Context, Result};
use clap::Subcommand;

use crate::services::{auth_service, tenant_service};

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user inside a tenant (e.g. the first admin)
    Create {
        /// Tenant name the user belongs to
        tenant: String,
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "member")]
        role: String,
        #[arg(long)]
        display_name: Option<String>,
    },
}

pub async fn run(command: UserCommands) -> Result<()> {
    match command {
        UserCommands::Create {
            tenant,
            email,
            password,
            role,
            display_name,
        } => {
            let tenant_row = tenant_service::get_by_name(&tenant)
                .await
                .context("failed to look up tenant")?;
            let Some(tenant_row) = tenant_row else {
                bail!("tenant not found: {}", tenant);
            };

            let display_name = display_name.unwrap_or_else(|| email.clone());
            let user = auth_service::create_user(
                tenant_row.id,
                &email,
                &display_name,
                &password,
                &role,
            )
            .await
            .context("failed to create user")?;
            println!("Created user {} ({}) in {}", user.email, user.id, tenant);
        }
    }
    Ok(())
}
