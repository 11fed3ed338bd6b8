use crate::adapters::postgres::PostgresConfig;
use crate::domain::model::{DestinationSchema, LoadPolicy, SourceKind};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_database_url, validate_file_extension, validate_non_empty_string, validate_path,
    validate_positive_number, validate_unique, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlConfig {
    pub pipeline: PipelineConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub jobs: Vec<JobConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub connect_timeout_seconds: Option<u64>,
    pub ensure_postgis: Option<bool>,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &crate::utils::validation::redact(&self.url))
            .field("connect_timeout_seconds", &self.connect_timeout_seconds)
            .field("ensure_postgis", &self.ensure_postgis)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub base_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: ".".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub source: SourceKind,
    /// CSV export, or a GeoJSON file produced by an earlier run.
    pub input: String,
    pub geojson_output: Option<String>,
    pub clean_csv_output: Option<String>,
    pub policy: Option<LoadPolicy>,
}

impl JobConfig {
    pub fn policy(&self) -> LoadPolicy {
        self.policy.unwrap_or_else(|| self.source.default_policy())
    }

    pub fn schema(&self) -> DestinationSchema {
        self.source.schema()
    }

    pub fn reads_geojson(&self) -> bool {
        Path::new(&self.input)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("geojson") || ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false)
    }

    fn validate_job(&self, index: usize) -> Result<()> {
        let field = |name: &str| format!("jobs[{}].{}", index, name);

        validate_non_empty_string(&field("name"), &self.name)?;
        validate_path(&field("input"), &self.input)?;
        validate_file_extension(&field("input"), &self.input, &["csv", "geojson", "json"])?;

        if let Some(output) = &self.geojson_output {
            validate_path(&field("geojson_output"), output)?;
            validate_file_extension(&field("geojson_output"), output, &["geojson", "json"])?;
        }

        if let Some(output) = &self.clean_csv_output {
            validate_path(&field("clean_csv_output"), output)?;
            if self.source != SourceKind::RouteStops || self.reads_geojson() {
                return Err(EtlError::ConfigValidationError {
                    field: field("clean_csv_output"),
                    message: "only route_stops jobs reading a CSV export produce a clean CSV".to_string(),
                });
            }
        }

        Ok(())
    }
}

impl EtlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigValidationError {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn postgres_config(&self) -> PostgresConfig {
        PostgresConfig {
            database_url: self.database.url.clone(),
            connect_timeout: Duration::from_secs(self.database.connect_timeout_seconds.unwrap_or(30)),
            ensure_postgis: self.database.ensure_postgis.unwrap_or(true),
        }
    }

    pub fn job(&self, name: &str) -> Option<&JobConfig> {
        self.jobs.iter().find(|job| job.name == name)
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("pipeline.name", &self.pipeline.name)?;
        validate_database_url("database.url", &self.database.url)?;
        if let Some(timeout) = self.database.connect_timeout_seconds {
            validate_positive_number("database.connect_timeout_seconds", timeout, 1)?;
        }
        validate_path("storage.base_path", &self.storage.base_path)?;

        if self.jobs.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "jobs".to_string(),
            });
        }
        for (index, job) in self.jobs.iter().enumerate() {
            job.validate_job(index)?;
        }
        validate_unique("jobs.name", self.jobs.iter().map(|job| job.name.as_str()))?;

        Ok(())
    }
}

impl Validate for EtlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
