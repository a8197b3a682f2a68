//! Configuration resolution for manhwa-import
//!
//! Settings resolve with environment variables over TOML file values
//! over compiled defaults. The environment names match the deployment
//! compose files (`MINIO_*` for the object store, `MANHWA_*` for the
//! service itself).

use manhwa_common::config::{env_bool, env_string, env_u64, load_toml};
use manhwa_common::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::services::SchedulerConfig;
use crate::storage::s3::S3Config;

/// On-disk TOML settings; every field optional
#[derive(Debug, Default, Deserialize)]
pub struct TomlSettings {
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub public_endpoint: Option<String>,
    pub catalog_db: Option<PathBuf>,
    pub bind: Option<String>,
    pub import_interval_minutes: Option<u64>,
    pub auto_import_enabled: Option<bool>,
    pub startup_grace_seconds: Option<u64>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub object_store: S3Config,
    /// Prefix scanned for generated payloads
    pub source_prefix: String,
    /// Prefix processed payloads are relocated to
    pub archive_prefix: String,
    pub catalog_db: PathBuf,
    pub bind: String,
    pub scheduler: SchedulerConfig,
}

impl ImportConfig {
    /// Resolve configuration from an optional TOML file plus the
    /// environment.
    pub fn resolve(toml_path: Option<&Path>) -> Result<Self> {
        let file: TomlSettings = match toml_path {
            Some(path) => load_toml(path)?,
            None => TomlSettings::default(),
        };

        let object_store = S3Config {
            endpoint: env_string("MINIO_ENDPOINT")
                .or(file.endpoint)
                .unwrap_or_else(|| "http://localhost:9000".to_string()),
            access_key: env_string("MINIO_ACCESS_KEY")
                .or(file.access_key)
                .unwrap_or_else(|| "minioadmin".to_string()),
            secret_key: env_string("MINIO_SECRET_KEY")
                .or(file.secret_key)
                .unwrap_or_else(|| "minioadmin".to_string()),
            bucket: env_string("MINIO_BUCKET_NAME")
                .or(file.bucket)
                .unwrap_or_else(|| "codex".to_string()),
            region: env_string("MINIO_REGION")
                .or(file.region)
                .unwrap_or_else(|| "us-east-1".to_string()),
            public_endpoint: env_string("MINIO_PUBLIC_ENDPOINT").or(file.public_endpoint),
        };

        let scheduler = SchedulerConfig {
            interval_minutes: env_u64("MANHWA_IMPORT_INTERVAL_MINUTES")
                .or(file.import_interval_minutes)
                .unwrap_or(30),
            auto_import_enabled: env_bool("MANHWA_AUTO_IMPORT_ENABLED")
                .or(file.auto_import_enabled)
                .unwrap_or(true),
            startup_grace: Duration::from_secs(
                env_u64("MANHWA_STARTUP_GRACE_SECONDS")
                    .or(file.startup_grace_seconds)
                    .unwrap_or(60),
            ),
        };

        Ok(Self {
            object_store,
            source_prefix: "generated/".to_string(),
            archive_prefix: "imported/".to_string(),
            catalog_db: env_string("MANHWA_CATALOG_DB")
                .map(PathBuf::from)
                .or(file.catalog_db)
                .unwrap_or_else(|| PathBuf::from("manhwa.db")),
            bind: env_string("MANHWA_BIND")
                .or(file.bind)
                .unwrap_or_else(|| "127.0.0.1:8090".to_string()),
            scheduler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_file_or_env() {
        // Env interactions are covered in manhwa-common; here only the
        // compiled defaults are checked
        let config = ImportConfig::resolve(None).unwrap();
        assert_eq!(config.source_prefix, "generated/");
        assert_eq!(config.archive_prefix, "imported/");
        assert_eq!(config.object_store.bucket, "codex");
        assert_eq!(config.scheduler.interval_minutes, 30);
        assert!(config.scheduler.auto_import_enabled);
    }

    #[test]
    fn toml_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("import.toml");
        std::fs::write(
            &path,
            "bucket = \"assets\"\nimport_interval_minutes = 5\nauto_import_enabled = false\n",
        )
        .unwrap();

        let config = ImportConfig::resolve(Some(&path)).unwrap();
        assert_eq!(config.object_store.bucket, "assets");
        assert_eq!(config.scheduler.interval_minutes, 5);
        assert!(!config.scheduler.auto_import_enabled);
    }
}
