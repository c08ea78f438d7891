use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShopListError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

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

    #[error("Invalid servings target {value}: must be a positive number")]
    InvalidServingsTarget { value: i64 },

    #[error("Invalid shopping list request: {message}")]
    InvalidRequest { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

pub type Result<T> = std::result::Result<T, ShopListError>;

/// 錯誤分類，用於日誌與結束碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Io,
    Serialization,
    Processing,
}

/// 錯誤嚴重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ShopListError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::InvalidServingsTarget { .. }
            | Self::InvalidRequest { .. }
            | Self::ValidationError { .. } => ErrorCategory::Input,
            Self::IoError(_) => ErrorCategory::Io,
            Self::SerializationError(_) | Self::CsvError(_) => ErrorCategory::Serialization,
            Self::ProcessingError { .. } => ErrorCategory::Processing,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Serialization => ErrorSeverity::High,
            ErrorCategory::Io | ErrorCategory::Processing => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::IoError(_) => {
                "Check that the input file exists and the output directory is writable"
            }
            Self::SerializationError(_) => {
                "Make sure the recipe file is valid JSON: an array of recipes or an object with a \"recipes\" field"
            }
            Self::CsvError(_) => "Retry with --format text or --format json",
            Self::ConfigError { .. } | Self::ConfigValidationError { .. } => {
                "Check the TOML configuration file syntax and section names"
            }
            Self::InvalidConfigValueError { .. } => "Fix the reported configuration value and retry",
            Self::MissingConfigError { .. } => {
                "Add the missing setting to the configuration file or command line"
            }
            Self::InvalidServingsTarget { .. } => {
                "Pass a servings target of at least 1, or omit it to keep recipe quantities"
            }
            Self::InvalidRequest { .. } => {
                "Select between 1 and the configured maximum number of recipes"
            }
            Self::ProcessingError { .. } => "Re-run with --verbose and report the log output",
            Self::ValidationError { .. } => "Check the input values and retry",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::IoError(e) => format!("Could not read or write a file: {}", e),
            Self::SerializationError(e) => format!("The recipe data could not be read: {}", e),
            Self::InvalidServingsTarget { value } => {
                format!("Servings target {} is not valid; it must be 1 or more", value)
            }
            Self::InvalidRequest { message } => {
                format!("Cannot build a shopping list: {}", message)
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_are_medium_severity() {
        let err = ShopListError::InvalidServingsTarget { value: 0 };
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.user_friendly_message().contains("1 or more"));
    }

    #[test]
    fn test_config_errors_are_high_severity() {
        let err = ShopListError::MissingConfigError {
            field: "recipes".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(err.to_string(), "Missing required configuration: recipes");
    }

    #[test]
    fn test_io_errors_convert_with_question_mark() {
        fn read_missing() -> Result<String> {
            Ok(std::fs::read_to_string("/definitely/not/here.json")?)
        }
        let err = read_missing().unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Io);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }
}
