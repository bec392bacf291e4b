use anyhow::{bail, Context};
use clap::Args;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{generate_jwt, Claims, Role};
use crate::cli::OutputFormat;
use crate::config;

#[derive(Args)]
pub struct TokenArgs {
    #[arg(long, help = "Username to embed in the token")]
    pub user: String,

    #[arg(long, help = "Tenant (site) id the token is scoped to")]
    pub site: i64,

    #[arg(
        long,
        default_value = "clinician",
        help = "Comma-separated roles: administrative, clinician"
    )]
    pub roles: String,
}

pub fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let roles = parse_roles(&args.roles)?;
    let claims = Claims::new(args.user.clone(), Uuid::new_v4(), args.site, &roles);
    let token = generate_jwt(&claims).context("failed to sign token")?;

    match output_format {
        OutputFormat::Json => {
            let body = json!({
                "token": token,
                "user": args.user,
                "site": args.site,
                "roles": roles.iter().map(|r| r.as_str()).collect::<Vec<_>>(),
                "expires_in_hours": config::config().security.jwt_expiry_hours,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Text => {
            println!("{}", token);
        }
    }
    Ok(())
}

fn parse_roles(raw: &str) -> anyhow::Result<Vec<Role>> {
    let mut roles = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|r| !r.is_empty()) {
        match name.parse::<Role>() {
            Ok(role) => roles.push(role),
            Err(()) => bail!("unknown role '{}'", name),
        }
    }
    if roles.is_empty() {
        bail!("at least one role is required");
    }
    Ok(roles)
}
