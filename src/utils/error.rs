use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Upstream responded with HTTP {status}: {status_text}")]
    UpstreamStatus { status: u16, status_text: String },

    #[error("Request timed out after {timeout_ms}ms (attempt {attempt})")]
    Timeout { attempt: u32, timeout_ms: u64 },

    #[error("Max retries exceeded")]
    MaxRetriesExceeded,

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Migration error: {message}")]
    MigrationError { message: String },

    #[error("Password hashing failed: {0}")]
    PasswordHashError(#[from] bcrypt::BcryptError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BridgeError {
    /// 5xx、逾時與網路錯誤可以重試；4xx 不重試
    pub fn is_retryable(&self) -> bool {
        match self {
            BridgeError::UpstreamStatus { status, .. } => *status >= 500,
            BridgeError::Timeout { .. } => true,
            BridgeError::HttpError(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            _ => false,
        }
    }

    /// 上游回傳的 HTTP 狀態碼（若有）
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            BridgeError::UpstreamStatus { status, .. } => Some(*status),
            BridgeError::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BridgeError::UpstreamStatus { status, .. } if *status < 500 => ErrorSeverity::Low,
            BridgeError::UpstreamStatus { .. }
            | BridgeError::Timeout { .. }
            | BridgeError::MaxRetriesExceeded
            | BridgeError::HttpError(_) => ErrorSeverity::Medium,
            BridgeError::ConfigError { .. }
            | BridgeError::ConfigValidationError { .. }
            | BridgeError::InvalidConfigValueError { .. }
            | BridgeError::MissingConfigError { .. }
            | BridgeError::CsvError(_)
            | BridgeError::SerializationError(_)
            | BridgeError::MigrationError { .. }
            | BridgeError::PasswordHashError(_) => ErrorSeverity::High,
            BridgeError::DatabaseError(_) | BridgeError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            BridgeError::HttpError(_) | BridgeError::Timeout { .. } => {
                "Unable to reach the upstream backend service".to_string()
            }
            BridgeError::UpstreamStatus { status, .. } => {
                format!("The upstream backend rejected the request (HTTP {})", status)
            }
            BridgeError::MaxRetriesExceeded => {
                "The upstream backend kept failing after all retries".to_string()
            }
            BridgeError::DatabaseError(e) => format!("Database operation failed: {}", e),
            BridgeError::ConfigError { .. }
            | BridgeError::ConfigValidationError { .. }
            | BridgeError::InvalidConfigValueError { .. }
            | BridgeError::MissingConfigError { .. } => format!("Invalid configuration: {}", self),
            _ => self.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            BridgeError::HttpError(_)
            | BridgeError::Timeout { .. }
            | BridgeError::MaxRetriesExceeded => {
                "Check that the backend service is running and BACKEND_URL points to it"
            }
            BridgeError::UpstreamStatus { .. } => "Check the request path, query and body",
            BridgeError::DatabaseError(_) => {
                "Check DB_HOST, DB_PORT, DB_USER, DB_PASSWORD and DB_NAME"
            }
            BridgeError::ConfigError { .. }
            | BridgeError::ConfigValidationError { .. }
            | BridgeError::InvalidConfigValueError { .. }
            | BridgeError::MissingConfigError { .. } => {
                "Fix the configuration file or the corresponding environment variable"
            }
            BridgeError::IoError(_) => "Check file paths and permissions",
            _ => "Re-run with --verbose for more detail",
        }
    }

    /// 依嚴重程度決定程式結束代碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl From<toml::de::Error> for BridgeError {
    fn from(e: toml::de::Error) -> Self {
        BridgeError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
