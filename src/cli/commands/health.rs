use anyhow::Context;
use serde_json::Value;

use crate::cli::OutputFormat;

pub async fn handle(url: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let endpoint = format!("{}/health", url.trim_end_matches('/'));
    let response = reqwest::get(&endpoint)
        .await
        .with_context(|| format!("failed to reach {}", endpoint))?;

    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Text => {
            let state = body
                .pointer("/data/status")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            println!("{} -> {} ({})", endpoint, status, state);
        }
    }

    if !status.is_success() {
        anyhow::bail!("server reported {}", status);
    }
    Ok(())
}
