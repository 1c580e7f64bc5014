use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Store error: {message}")]
    StoreError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Processing,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl MergeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            MergeError::ConfigError { .. }
            | MergeError::ConfigValidationError { .. }
            | MergeError::InvalidConfigValueError { .. }
            | MergeError::MissingConfigError { .. } => ErrorCategory::Configuration,
            MergeError::CsvError(_)
            | MergeError::SerializationError(_)
            | MergeError::ValidationError { .. } => ErrorCategory::Input,
            MergeError::ProcessingError { .. } => ErrorCategory::Processing,
            MergeError::ZipError(_) | MergeError::IoError(_) | MergeError::StoreError { .. } => {
                ErrorCategory::Storage
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            MergeError::ValidationError { .. } => ErrorSeverity::Medium,
            MergeError::StoreError { .. } => ErrorSeverity::Medium,
            MergeError::CsvError(_)
            | MergeError::SerializationError(_)
            | MergeError::ProcessingError { .. }
            | MergeError::ConfigError { .. }
            | MergeError::ConfigValidationError { .. }
            | MergeError::InvalidConfigValueError { .. }
            | MergeError::MissingConfigError { .. } => ErrorSeverity::High,
            MergeError::ZipError(_) | MergeError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the job TOML file: paths, block ids and placeholder mappings"
            }
            ErrorCategory::Input => {
                "Check that the records file is valid CSV and any JSON inputs are well-formed"
            }
            ErrorCategory::Processing => "Re-run with --verbose to see which record failed",
            ErrorCategory::Storage => {
                "Check that input files exist and the output directory is writable"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            MergeError::IoError(e) => format!("Could not read or write a file: {}", e),
            MergeError::CsvError(e) => format!("The records file could not be parsed: {}", e),
            MergeError::ZipError(e) => format!("The output archive could not be written: {}", e),
            MergeError::MissingConfigError { field } => {
                format!("The configuration is missing '{}'", field)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MergeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_high_severity() {
        let err = MergeError::MissingConfigError {
            field: "template.path".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.user_friendly_message().contains("template.path"));
    }

    #[test]
    fn test_io_errors_are_critical() {
        let err = MergeError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(err.category(), ErrorCategory::Storage);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }
}
