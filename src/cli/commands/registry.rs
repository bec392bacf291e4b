use crate::cli::OutputFormat;
use crate::config;
use crate::registry::PartitionRegistry;

pub fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let registry = PartitionRegistry::from_entries(config::config().sites.clone())?;

    match output_format {
        OutputFormat::Json => {
            let sites: Vec<_> = registry.iter().collect();
            println!("{}", serde_json::to_string_pretty(&sites)?);
        }
        OutputFormat::Text => {
            println!("{:<10} {:<12} {:<24} {}", "TENANT", "SITE", "DATABASE", "ROLE");
            for target in registry.iter() {
                let role = if target.aggregation_root {
                    "aggregation root / catalog"
                } else {
                    "remote partition"
                };
                println!(
                    "{:<10} {:<12} {:<24} {}",
                    target.tenant_id, target.name, target.database, role
                );
            }
        }
    }
    Ok(())
}
