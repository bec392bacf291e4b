pub mod commands;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "medctl")]
#[command(about = "MedCenter CLI - operational tooling for the clinical records API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Mint a development JWT for a site user")]
    Token(commands::token::TokenArgs),

    #[command(about = "Show the configured partition registry")]
    Registry,

    #[command(about = "Check a running server's health endpoint")]
    Health {
        #[arg(long, default_value = "http://127.0.0.1:3000", help = "Server base URL")]
        url: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Token(args) => commands::token::handle(args, output_format),
        Commands::Registry => commands::registry::handle(output_format),
        Commands::Health { url } => commands::health::handle(&url, output_format).await,
    }
}
