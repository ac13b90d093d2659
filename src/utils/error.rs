use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API rejected the request: {message}")]
    ApiRejected { message: String },

    #[error("Unexpected API response: {message}")]
    UnexpectedResponse { message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

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

    #[error("Status code {code} is assigned to both '{first}' and '{second}'")]
    OverlappingRuleError {
        code: i64,
        first: String,
        second: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DashboardError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DashboardError::ApiError(_)
            | DashboardError::ApiRejected { .. }
            | DashboardError::UnexpectedResponse { .. } => ErrorCategory::Network,
            DashboardError::TomlError(_)
            | DashboardError::ConfigValidationError { .. }
            | DashboardError::InvalidConfigValueError { .. }
            | DashboardError::MissingConfigError { .. }
            | DashboardError::OverlappingRuleError { .. } => ErrorCategory::Configuration,
            DashboardError::CsvError(_) | DashboardError::SerializationError(_) => ErrorCategory::Data,
            DashboardError::ZipError(_) | DashboardError::IoError(_) => ErrorCategory::Storage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 網路錯誤可重新執行
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            DashboardError::ApiError(_) => "Check network connectivity and the source endpoint, then run again",
            DashboardError::ApiRejected { .. } => "Review the search filter and text sent to the API",
            DashboardError::UnexpectedResponse { .. } => "Verify the endpoint returns the { isSuccess, data: { value } } envelope",
            DashboardError::TomlError(_) => "Fix the TOML syntax in the configuration file",
            DashboardError::ConfigValidationError { .. }
            | DashboardError::InvalidConfigValueError { .. }
            | DashboardError::MissingConfigError { .. } => "Correct the configuration value named in the message",
            DashboardError::OverlappingRuleError { .. } => "Assign each status code to a single category in [categories]",
            DashboardError::CsvError(_) | DashboardError::SerializationError(_) => "Inspect the fetched records for unexpected field types",
            DashboardError::ZipError(_) | DashboardError::IoError(_) => "Check that the output path exists and is writable",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("No se pudieron obtener los trámites: {}", self),
            ErrorCategory::Configuration => format!("Configuración inválida: {}", self),
            ErrorCategory::Data => format!("Error procesando los trámites: {}", self),
            ErrorCategory::Storage => format!("No se pudo guardar el reporte: {}", self),
        }
    }

    /// `recovery_suggestion` en el idioma de `user_friendly_message`
    pub fn user_friendly_suggestion(&self) -> &'static str {
        match self {
            DashboardError::ApiError(_) => "Revise la conexión y el endpoint de origen, luego intente de nuevo",
            DashboardError::ApiRejected { .. } => "Revise el filtro y el texto de búsqueda enviados a la API",
            DashboardError::UnexpectedResponse { .. } => "Verifique que el endpoint responda con { isSuccess, data: { value } }",
            DashboardError::TomlError(_) => "Corrija la sintaxis TOML del archivo de configuración",
            DashboardError::ConfigValidationError { .. }
            | DashboardError::InvalidConfigValueError { .. }
            | DashboardError::MissingConfigError { .. } => "Corrija el valor de configuración indicado en el mensaje",
            DashboardError::OverlappingRuleError { .. } => "Asigne cada código de estado a una sola categoría en [categories]",
            DashboardError::CsvError(_) | DashboardError::SerializationError(_) => "Revise los trámites recibidos por tipos de campo inesperados",
            DashboardError::ZipError(_) | DashboardError::IoError(_) => "Verifique que la ruta de salida exista y tenga permisos de escritura",
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
