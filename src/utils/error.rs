use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Cannot repair coordinate '{value}': {reason}")]
    ParseError { value: String, reason: String },

    #[error("Record skipped: {reason}")]
    SkipRecord { reason: String },

    #[error("Required field '{field}' is missing")]
    MissingField { field: String },

    #[error("Geometry error: {message}")]
    GeometryError { message: String },

    #[error("Load into '{table}' failed: {message}")]
    LoadError { table: String, message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJsonError(#[from] geojson::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Transform,
    Load,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn load(table: impl Into<String>, message: impl std::fmt::Display) -> Self {
        EtlError::LoadError {
            table: table.into(),
            message: message.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::CsvError(_) | EtlError::MissingField { .. } => ErrorCategory::Input,
            EtlError::ParseError { .. }
            | EtlError::SkipRecord { .. }
            | EtlError::GeometryError { .. }
            | EtlError::GeoJsonError(_)
            | EtlError::SerializationError(_)
            | EtlError::ValidationError { .. } => ErrorCategory::Transform,
            EtlError::LoadError { .. } => ErrorCategory::Load,
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::SkipRecord { .. } => ErrorSeverity::Low,
            EtlError::LoadError { .. } => ErrorSeverity::Medium,
            EtlError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// Whether the batch may continue past this error.
    pub fn is_skippable(&self) -> bool {
        matches!(self, EtlError::SkipRecord { .. })
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Check the CSV header names and that every row has the expected columns",
            ErrorCategory::Transform => {
                "Inspect the offending value in the source export; coordinates must carry two integer digits"
            }
            ErrorCategory::Load => {
                "Verify the database is reachable, PostGIS is installed and the row values fit the column types"
            }
            ErrorCategory::Configuration => "Fix the configuration file and run again",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::ParseError { value, .. } => {
                format!("Coordinate value '{}' could not be repaired", value)
            }
            EtlError::LoadError { table, .. } => {
                format!("Loading table '{}' failed; the batch was not committed", table)
            }
            EtlError::MissingConfigError { field } => {
                format!("The configuration is missing '{}'", field)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
