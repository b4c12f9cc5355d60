//! JSON Schema validation for deployment parameter documents

use crate::error::ConfigError;
use anyhow::{Result, anyhow};
use jsonschema::Validator;
use serde_json::Value;

/// Get the embedded JSON schema for deployment parameter documents
pub fn get_schema() -> Result<Validator> {
    let schema_str = include_str!("../../docs/deployment.schema.json");
    let schema: Value = serde_json::from_str(schema_str)
        .map_err(|e| anyhow!("Failed to parse embedded JSON schema: {}", e))?;

    jsonschema::draft7::new(&schema).map_err(|e| anyhow!("Failed to compile JSON schema: {}", e))
}

/// Validate a deployment parameter document against the schema
pub fn validate_against_schema(document: &Value) -> Result<()> {
    let schema = get_schema()?;

    let error_messages: Vec<String> = schema
        .iter_errors(document)
        .map(|e| format!("  - {e}"))
        .collect();

    if !error_messages.is_empty() {
        return Err(ConfigError::configuration(format!(
            "Deployment parameters are malformed:\n{}",
            error_messages.join("\n")
        ))
        .into());
    }

    Ok(())
}
