use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Resource '{location}' could not be fetched: {message}")]
    ResourceError { location: String, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Unusable data in {source_name}: {message}")]
    DataShapeError {
        source_name: String,
        message: String,
    },

    #[error("Treemap layout failed: {message}")]
    LayoutError { message: String },

    #[error("Word cloud packing failed for '{department}': {message}")]
    WordCloudError { department: String, message: String },

    #[error("Font \"{family}\" not found. Make sure it's loaded.")]
    FontNotFound { family: String },

    #[error("PNG export failed: {message}")]
    ExportError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Configuration,
    Layout,
    Export,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RenderError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RenderError::HttpError(_) | RenderError::ResourceError { .. } => {
                ErrorCategory::Network
            }
            RenderError::CsvError(_)
            | RenderError::SerializationError(_)
            | RenderError::DataShapeError { .. } => ErrorCategory::Data,
            RenderError::TomlError(_)
            | RenderError::ConfigError { .. }
            | RenderError::InvalidConfigValueError { .. }
            | RenderError::MissingConfigError { .. } => ErrorCategory::Configuration,
            RenderError::LayoutError { .. } | RenderError::WordCloudError { .. } => {
                ErrorCategory::Layout
            }
            RenderError::FontNotFound { .. } | RenderError::ExportError { .. } => {
                ErrorCategory::Export
            }
            RenderError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單一格子的文字雲失敗不影響其他格子
            RenderError::WordCloudError { .. } => ErrorSeverity::Low,
            RenderError::HttpError(_) | RenderError::ResourceError { .. } => {
                ErrorSeverity::Medium
            }
            RenderError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            RenderError::HttpError(_) | RenderError::ResourceError { .. } => {
                "Check the resource location and network connectivity, then retry".to_string()
            }
            RenderError::CsvError(_) => {
                "Make sure the funding file is a CSV with 'department' and 'funding' columns"
                    .to_string()
            }
            RenderError::SerializationError(_) | RenderError::DataShapeError { .. } => {
                "Make sure the word file maps department -> word -> integer count".to_string()
            }
            RenderError::TomlError(_) | RenderError::ConfigError { .. } => {
                "Check the TOML configuration file syntax".to_string()
            }
            RenderError::InvalidConfigValueError { field, .. } => {
                format!("Fix the value of '{}' and try again", field)
            }
            RenderError::MissingConfigError { field } => {
                format!("Provide a value for '{}'", field)
            }
            RenderError::LayoutError { .. } => {
                "Make sure the canvas is larger than twice the outer padding".to_string()
            }
            RenderError::WordCloudError { .. } => {
                "The cell was rendered without words; no action needed".to_string()
            }
            RenderError::FontNotFound { family } => format!(
                "Install the \"{}\" font or pass its directory with --font-dir",
                family
            ),
            RenderError::ExportError { .. } => {
                "Re-run the export; if it keeps failing, save the SVG with --save-svg".to_string()
            }
            RenderError::IoError(_) => {
                "Check file permissions and available disk space".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            RenderError::FontNotFound { family } => {
                format!("Font \"{}\" not found. Export might not work correctly.", family)
            }
            RenderError::HttpError(_) | RenderError::ResourceError { .. } => {
                format!("Could not load the input data: {}", self)
            }
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_not_found_is_export_error() {
        let err = RenderError::FontNotFound {
            family: "DM Sans".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Export);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.user_friendly_message().contains("DM Sans"));
        assert!(err.recovery_suggestion().contains("--font-dir"));
    }

    #[test]
    fn test_word_cloud_errors_are_low_severity() {
        let err = RenderError::WordCloudError {
            department: "Department of Energy".to_string(),
            message: "cell too small".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert_eq!(err.category(), ErrorCategory::Layout);
    }

    #[test]
    fn test_resource_errors_are_retryable() {
        let err = RenderError::ResourceError {
            location: "http://example.com/data.csv".to_string(),
            message: "404 Not Found".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(err.category(), ErrorCategory::Network);
    }
}
