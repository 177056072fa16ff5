use schemars::schema_for;

use crate::config::EcosystemConfig;

/// Print the JSON Schema for `ecosystem.toml` / `ecosystem.json` to stdout.
pub fn run_schema() -> anyhow::Result<()> {
    let schema = schema_for!(EcosystemConfig);
    let json = serde_json::to_string_pretty(&schema)?;
    println!("{json}");
    Ok(())
}
