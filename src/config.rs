use crate::error::{PipelineError, Result};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub warehouse: WarehouseConfig,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

fn default_endpoint() -> String {
    "https://storage.googleapis.com".to_string()
}

#[derive(Debug, Deserialize)]
pub struct WarehouseConfig {
    pub project_id: String,
    pub dataset: String,
    pub table: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = "config.toml";
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            PipelineError::Config(format!("Failed to read config file '{config_path}': {e}"))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let raw = r#"
            [storage]
            bucket = "transactions-data"

            [warehouse]
            project_id = "analytics-prod"
            dataset = "sales"
            table = "transactions"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.storage.bucket, "transactions-data");
        assert_eq!(config.storage.endpoint, "https://storage.googleapis.com");
        assert_eq!(config.warehouse.table, "transactions");
    }
}
