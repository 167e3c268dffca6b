//! Tasker configuration.
//!
//! Values come from built-in defaults, a YAML file, or `TASKER_*`
//! environment variables.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tiling::ZoomRangeCalculator;
use tracing::warn;

use crate::error::{IngestionError, Result};

/// Prefix of every environment variable read by [`TaskerConfig::from_env`].
pub const ENV_PREFIX: &str = "TASKER_";

/// Configuration for task generation and submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskerConfig {
    /// Comma separated zoom groups, e.g. `"0-10,11,12"`.
    pub zoom_groups: String,

    /// Maximum tiles in one merge task.
    pub tile_batch_size: u64,

    /// Tasks sent to the job store per request.
    pub task_batch_size: usize,

    /// Maximum tiles at a range's max zoom inside one new-layer task bbox.
    pub max_tiles_per_bbox: u64,

    /// Tile storage provider written into task sources (`FS`, `S3`).
    pub tiles_storage_provider: String,

    /// Cap on layers entering one overlap decomposition.
    pub max_overlap_layers: usize,

    pub new_job_type: String,
    pub update_job_type: String,
    pub split_task_type: String,
    pub merge_task_type: String,
    pub job_domain: String,
}

impl Default for TaskerConfig {
    fn default() -> Self {
        Self {
            zoom_groups: "0-10,11,12,13,14,15,16,17,18,19,20,21,22".to_string(),
            tile_batch_size: 10_000,
            task_batch_size: 100,
            max_tiles_per_bbox: 10_000,
            tiles_storage_provider: "FS".to_string(),
            max_overlap_layers: tiling::DEFAULT_MAX_OVERLAP_LAYERS,
            new_job_type: "Ingestion_New".to_string(),
            update_job_type: "Ingestion_Update".to_string(),
            split_task_type: "tilesSplitting".to_string(),
            merge_task_type: "tilesMerging".to_string(),
            job_domain: "RASTER".to_string(),
        }
    }
}

fn parse_into<T: std::str::FromStr>(key: &str, value: &str, target: &mut T) {
    match value.parse() {
        Ok(parsed) => *target = parsed,
        Err(_) => warn!(key = key, value = value, "Ignoring unparseable config value"),
    }
}

impl TaskerConfig {
    /// Load configuration from `TASKER_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from defaults overridden by `lookup`, which maps
    /// full variable names (with prefix) to values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let var = |name: &str| {
            let key = format!("{}{}", ENV_PREFIX, name);
            lookup(&key).map(|value| (key, value))
        };

        if let Some((_, val)) = var("ZOOM_GROUPS") {
            config.zoom_groups = val;
        }
        if let Some((key, val)) = var("TILE_BATCH_SIZE") {
            parse_into(&key, &val, &mut config.tile_batch_size);
        }
        if let Some((key, val)) = var("TASK_BATCH_SIZE") {
            parse_into(&key, &val, &mut config.task_batch_size);
        }
        if let Some((key, val)) = var("MAX_TILES_PER_BBOX") {
            parse_into(&key, &val, &mut config.max_tiles_per_bbox);
        }
        if let Some((_, val)) = var("TILES_STORAGE_PROVIDER") {
            config.tiles_storage_provider = val.to_uppercase();
        }
        if let Some((key, val)) = var("MAX_OVERLAP_LAYERS") {
            parse_into(&key, &val, &mut config.max_overlap_layers);
        }
        if let Some((_, val)) = var("NEW_JOB_TYPE") {
            config.new_job_type = val;
        }
        if let Some((_, val)) = var("UPDATE_JOB_TYPE") {
            config.update_job_type = val;
        }
        if let Some((_, val)) = var("SPLIT_TASK_TYPE") {
            config.split_task_type = val;
        }
        if let Some((_, val)) = var("MERGE_TASK_TYPE") {
            config.merge_task_type = val;
        }
        if let Some((_, val)) = var("JOB_DOMAIN") {
            config.job_domain = val;
        }

        config
    }

    /// Load and validate configuration from a YAML file. Missing keys keep
    /// their defaults.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            IngestionError::InvalidConfig(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.tile_batch_size == 0 {
            return Err(IngestionError::InvalidConfig(
                "tile_batch_size must be > 0".to_string(),
            ));
        }
        if self.task_batch_size == 0 {
            return Err(IngestionError::InvalidConfig(
                "task_batch_size must be > 0".to_string(),
            ));
        }
        if self.max_overlap_layers == 0 {
            return Err(IngestionError::InvalidConfig(
                "max_overlap_layers must be > 0".to_string(),
            ));
        }
        if self.tiles_storage_provider.is_empty() {
            return Err(IngestionError::InvalidConfig(
                "tiles_storage_provider must not be empty".to_string(),
            ));
        }
        self.zoom_calculator()?;
        Ok(())
    }

    /// Parsed zoom groups.
    pub fn zoom_calculator(&self) -> Result<ZoomRangeCalculator> {
        Ok(self.zoom_groups.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = TaskerConfig::default();
        assert_eq!(config.tile_batch_size, 10_000);
        assert_eq!(config.task_batch_size, 100);
        assert_eq!(config.max_tiles_per_bbox, 10_000);
        assert_eq!(config.tiles_storage_provider, "FS");
        assert_eq!(config.max_overlap_layers, 16);
        assert!(config.validate().is_ok());
        assert_eq!(config.zoom_calculator().unwrap().groups().len(), 13);
    }

    #[test]
    fn test_config_validation() {
        let mut config = TaskerConfig::default();
        config.task_batch_size = 0;
        assert!(matches!(config.validate(), Err(IngestionError::InvalidConfig(_))));

        config = TaskerConfig::default();
        config.tile_batch_size = 0;
        assert!(config.validate().is_err());

        config = TaskerConfig::default();
        config.zoom_groups = "0-3,,4".to_string();
        assert!(matches!(config.validate(), Err(IngestionError::Tiling(_))));
    }

    #[test]
    fn test_from_lookup_overrides_defaults() {
        let vars: HashMap<&str, &str> = [
            ("TASKER_ZOOM_GROUPS", "0-5,6"),
            ("TASKER_TASK_BATCH_SIZE", "7"),
            ("TASKER_TILES_STORAGE_PROVIDER", "s3"),
            ("TASKER_TILE_BATCH_SIZE", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = TaskerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.zoom_groups, "0-5,6");
        assert_eq!(config.task_batch_size, 7);
        assert_eq!(config.tiles_storage_provider, "S3");
        assert_eq!(config.tile_batch_size, 10_000);
    }

    #[test]
    fn test_from_yaml_file_keeps_missing_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "zoom_groups: \"0-2,3\"").unwrap();
        writeln!(file, "task_batch_size: 5").unwrap();

        let config = TaskerConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.zoom_groups, "0-2,3");
        assert_eq!(config.task_batch_size, 5);
        assert_eq!(config.merge_task_type, "tilesMerging");
    }

    #[test]
    fn test_from_yaml_file_errors() {
        assert!(matches!(
            TaskerConfig::from_yaml_file("/nonexistent/tasker.yaml"),
            Err(IngestionError::Other(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "task_batch_size: [1, 2]").unwrap();
        assert!(matches!(
            TaskerConfig::from_yaml_file(file.path()),
            Err(IngestionError::InvalidConfig(_))
        ));
    }
}
