use std::path::Path;
use crate::errors::FuzzError;
use super::types::{GqlFuzzConfig, RunConfig};
use super::schema::CONFIG_SCHEMA;
use tracing::warn;

pub async fn parse_config(path: &Path) -> Result<GqlFuzzConfig, FuzzError> {
    if !path.exists() {
        return Err(FuzzError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(FuzzError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    let yaml: serde_yaml::Value = serde_yaml::from_str(&content)?;

    // An empty file is a valid, all-defaults config
    if yaml.is_null() {
        return Ok(GqlFuzzConfig::default());
    }

    validate_schema(&yaml)?;

    let config: GqlFuzzConfig = serde_yaml::from_value(yaml)?;

    validate_conflicts(&config)?;

    Ok(config)
}

/// Validate config against the JSON schema for structural correctness.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), FuzzError> {
    let json_value = serde_json::to_value(yaml)
        .map_err(|e| FuzzError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| FuzzError::Config(format!("Schema compilation error: {}", e)))?;

    let result = compiled.validate(&json_value);
    if let Err(errors) = result {
        // Advisory only: typed parsing below is the hard gate
        for e in errors {
            warn!(validation_error = %format!("{} at {}", e, e.instance_path), "Config schema warning");
        }
    }

    Ok(())
}

/// Detect semantic conflicts in the parsed configuration file.
fn validate_conflicts(config: &GqlFuzzConfig) -> Result<(), FuzzError> {
    if let Some(m) = &config.materializer {
        for (name, value) in [
            ("max_object_cycles", m.max_object_cycles),
            ("max_output_depth", m.max_output_depth),
            ("max_input_depth", m.max_input_depth),
            ("hard_cutoff_depth", m.hard_cutoff_depth),
        ] {
            if value == Some(0) {
                return Err(FuzzError::Config(format!("materializer.{name} must be greater than 0")));
            }
        }
        if let (Some(output), Some(cutoff)) = (m.max_output_depth, m.hard_cutoff_depth) {
            if output > cutoff {
                return Err(FuzzError::Config(format!(
                    "materializer.max_output_depth ({output}) exceeds hard_cutoff_depth ({cutoff})"
                )));
            }
        }
    }

    if let Some(f) = &config.fuzzing {
        if f.max_time_secs == Some(0) {
            return Err(FuzzError::Config("fuzzing.max_time_secs must be greater than 0".into()));
        }
        if f.skip_dos_attacks == Some(false) && f.max_fuzzing_iterations == Some(0) {
            warn!("DoS attacks enabled but max_fuzzing_iterations is 0, no DoS payloads will run");
        }
    }

    if let Some(r) = &config.request {
        if r.authorization.as_ref().is_some_and(|a| a.trim().is_empty()) {
            warn!("Authorization configured but empty");
        }
    }

    Ok(())
}

/// Checks the merged settings, after CLI overrides, against an optional
/// single-node target.
pub fn validate_run_config(config: &RunConfig, target_node: Option<&str>) -> Result<(), FuzzError> {
    if config.limits.max_output_depth > config.limits.hard_cutoff_depth {
        return Err(FuzzError::Config(format!(
            "max_output_depth ({}) exceeds hard_cutoff_depth ({})",
            config.limits.max_output_depth, config.limits.hard_cutoff_depth
        )));
    }
    if let Some(node) = target_node {
        if config.is_skipped(node) {
            return Err(FuzzError::Config(format!(
                "Node '{node}' is both targeted and listed in skip_nodes"
            )));
        }
    }
    Ok(())
}
