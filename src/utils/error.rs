use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrptError {
    #[error("API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Processing error: {message}")]
    ProcessingError { message: String },
}

pub type Result<T> = std::result::Result<T, CrptError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CrptError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CrptError::Http(_) => ErrorCategory::Network,
            CrptError::ConfigError { .. }
            | CrptError::MissingConfigError { .. }
            | CrptError::InvalidConfigValueError { .. }
            | CrptError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            CrptError::SerializationError(_)
            | CrptError::ValidationError { .. }
            | CrptError::ProcessingError { .. } => ErrorCategory::Data,
            CrptError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // Timeouts and dropped connections usually clear up on their own.
            CrptError::Http(e) if e.is_timeout() || e.is_connect() => ErrorSeverity::Medium,
            CrptError::Http(_) => ErrorSeverity::High,
            CrptError::ValidationError { .. } | CrptError::ProcessingError { .. } => {
                ErrorSeverity::High
            }
            CrptError::SerializationError(_) => ErrorSeverity::High,
            CrptError::ConfigError { .. }
            | CrptError::MissingConfigError { .. }
            | CrptError::InvalidConfigValueError { .. }
            | CrptError::ConfigValidationError { .. } => ErrorSeverity::Critical,
            CrptError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            CrptError::Http(e) if e.is_timeout() => {
                "Increase api.timeout_seconds or retry later"
            }
            CrptError::Http(e) if e.is_builder() => {
                "Check the signature and extra headers for characters not allowed in HTTP headers"
            }
            CrptError::Http(_) => "Check network connectivity and the api.base_url setting",
            CrptError::IoError(_) => "Check that the file exists and is readable",
            CrptError::SerializationError(_) => "Check that the document file is valid JSON",
            CrptError::ConfigError { .. }
            | CrptError::MissingConfigError { .. }
            | CrptError::InvalidConfigValueError { .. }
            | CrptError::ConfigValidationError { .. } => {
                "Review the configuration file and command line flags"
            }
            CrptError::ValidationError { .. } => "Fix the document fields reported above",
            CrptError::ProcessingError { .. } => "Inspect the logs with --verbose for details",
        }
    }

    /// Process exit status for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach the CRPT API: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Data => format!("Document could not be processed: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_critical() {
        let err = CrptError::MissingConfigError {
            field: "api.base_url".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.user_friendly_message().starts_with("Invalid configuration"));
    }

    #[test]
    fn test_validation_error_message() {
        let err = CrptError::ValidationError {
            message: "doc_type is required".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Data);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(err.to_string(), "Validation error: doc_type is required");
    }

    #[test]
    fn test_exit_codes_follow_severity() {
        let missing_file = CrptError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "crpt.toml",
        ));
        assert_eq!(missing_file.exit_code(), 3);

        let bad_count = CrptError::InvalidConfigValueError {
            field: "--count".to_string(),
            value: "0".to_string(),
            reason: "Value must be at least 1".to_string(),
        };
        assert_eq!(bad_count.exit_code(), 3);

        let bad_document = CrptError::ValidationError {
            message: "doc_type is required".to_string(),
        };
        assert_eq!(bad_document.exit_code(), 1);
    }

    #[test]
    fn test_serde_error_converts() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let err: CrptError = parse.unwrap_err().into();
        assert!(matches!(err, CrptError::SerializationError(_)));
        assert_eq!(err.category(), ErrorCategory::Data);
    }
}
