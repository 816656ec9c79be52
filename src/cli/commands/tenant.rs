use anyhow::{Context, Result};
use clap::Subcommand;

use crate::database::page::PageParams;
use crate::services::tenant_service;

#[derive(Subcommand)]
pub enum TenantCommands {
    /// Create a tenant with its plan's default quotas
    Create {
        name: String,
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long, default_value = "free")]
        plan: String,
    },
    /// List active tenants
    List,
}

pub async fn run(command: TenantCommands) -> Result<()> {
    match command {
        TenantCommands::Create {
            name,
            display_name,
            plan,
        } => {
            let display_name = display_name.unwrap_or_else(|| name.clone());
            let tenant = tenant_service::create(&name, &display_name, &plan)
                .await
                .context("failed to create tenant")?;
            println!("Created tenant {} ({})", tenant.name, tenant.id);
        }
        TenantCommands::List => {
            let page = PageParams::default().resolve(&["created_at", "name"]);
            let result = tenant_service::list(&page)
                .await
                .context("failed to list tenants")?;
            println!("{} tenant(s)", result.total);
            for tenant in result.items {
                println!(
                    "{}  {:<30} plan={:<10} active={}",
                    tenant.id, tenant.name, tenant.plan, tenant.active
                );
            }
        }
    }
    Ok(())
}
