//! Error types for quire operations.
//!
//! Errors carry a structured [`ErrorCode`] and, where it helps, a suggestion
//! for resolution.

use thiserror::Error;

/// Result type alias for quire operations.
pub type QuireResult<T> = Result<T, QuireError>;

/// Main error type for the agent shell and its services.
#[derive(Error, Debug)]
pub enum QuireError {
    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        suggestion: Option<String>,
    },

    /// Session not found.
    #[error("Session not found: {message}")]
    SessionNotFound {
        message: String,
        code: ErrorCode,
        session_id: Option<String>,
    },

    /// Artifact store operation failed.
    #[error("Artifact error: {message}")]
    Artifact {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// LLM operation failed.
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Tool invocation failed.
    #[error("Tool error: {message}")]
    Tool {
        message: String,
        code: ErrorCode,
        tool: Option<String>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network error.
    #[error("Network error: {message}")]
    Network {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Provider not supported.
    #[error("Provider not supported: {provider}")]
    UnsupportedProvider { provider: String },

    /// Parse error.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValInvalidInput,
    ValMissingField,

    // Session (SES_xxx)
    SesNotFound,

    // Artifact (ART_xxx)
    ArtNotFound,
    ArtOperationFailed,

    // LLM (LLM_xxx)
    LlmConnectionFailed,
    LlmGenerationFailed,
    LlmInvalidResponse,

    // Tool (TOOL_xxx)
    ToolUnknown,
    ToolFailed,

    // Network (NET_xxx)
    NetTimeout,
    NetConnectionFailed,

    // Config (CFG_xxx)
    CfgInvalid,

    // Parse (PARSE_xxx)
    ParseInvalidJson,
    ParseMissingField,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValMissingField => "VAL_002",
            ErrorCode::SesNotFound => "SES_001",
            ErrorCode::ArtNotFound => "ART_001",
            ErrorCode::ArtOperationFailed => "ART_002",
            ErrorCode::LlmConnectionFailed => "LLM_001",
            ErrorCode::LlmGenerationFailed => "LLM_002",
            ErrorCode::LlmInvalidResponse => "LLM_003",
            ErrorCode::ToolUnknown => "TOOL_001",
            ErrorCode::ToolFailed => "TOOL_002",
            ErrorCode::NetTimeout => "NET_001",
            ErrorCode::NetConnectionFailed => "NET_002",
            ErrorCode::CfgInvalid => "CFG_001",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::ParseMissingField => "PARSE_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl QuireError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            suggestion: None,
        }
    }

    /// Create a validation error with suggestion.
    pub fn validation_with_suggestion(
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            suggestion: Some(suggestion.into()),
        }
    }

    /// Create a session not found error.
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        let id = session_id.into();
        Self::SessionNotFound {
            message: format!("Session with id '{}' not found", id),
            code: ErrorCode::SesNotFound,
            session_id: Some(id),
        }
    }

    /// Create an artifact store error.
    pub fn artifact(message: impl Into<String>) -> Self {
        Self::Artifact {
            message: message.into(),
            code: ErrorCode::ArtOperationFailed,
            source: None,
        }
    }

    /// Create an LLM error.
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmGenerationFailed,
            source: None,
        }
    }

    /// Create an LLM error for a response that could not be understood.
    pub fn llm_invalid_response(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmInvalidResponse,
            source: None,
        }
    }

    /// Create a tool error.
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            message: message.into(),
            code: ErrorCode::ToolFailed,
            tool: Some(tool.into()),
        }
    }

    /// Create an error for a tool name the agent does not know.
    pub fn unknown_tool(tool: impl Into<String>) -> Self {
        let tool = tool.into();
        Self::Tool {
            message: format!("Unknown tool '{}'", tool),
            code: ErrorCode::ToolUnknown,
            tool: Some(tool),
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidJson,
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            code: ErrorCode::NetConnectionFailed,
            source: None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::SessionNotFound { code, .. } => *code,
            Self::Artifact { code, .. } => *code,
            Self::Llm { code, .. } => *code,
            Self::Tool { code, .. } => *code,
            Self::Network { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            Self::Configuration(_) => ErrorCode::CfgInvalid,
            _ => ErrorCode::Internal,
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::SessionNotFound { .. } => Some("Create the session before sending messages to it"),
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::Llm { .. } => Some("Please check that the model server is running and the model is pulled"),
            Self::Network { .. } => Some("Please check the LLM base URL and your network connection"),
            Self::Configuration(_) => Some("Please check your quire configuration file and environment"),
            _ => None,
        }
    }

    /// Convert from an HTTP status code returned by a model server.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            400 | 422 => Self::Validation {
                message: body.to_string(),
                code: ErrorCode::ValInvalidInput,
                suggestion: Some("Please check your request parameters".to_string()),
            },
            404 => Self::Llm {
                message: format!("Model or endpoint not found: {}", body),
                code: ErrorCode::LlmConnectionFailed,
                source: None,
            },
            408 | 504 => Self::Network {
                message: body.to_string(),
                code: ErrorCode::NetTimeout,
                source: None,
            },
            _ => Self::Llm {
                message: format!("HTTP {}: {}", status, body),
                code: ErrorCode::LlmGenerationFailed,
                source: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = QuireError::validation("Invalid input");
        assert_eq!(err.code(), ErrorCode::ValInvalidInput);
        assert!(err.to_string().contains("Invalid input"));
    }

    #[test]
    fn test_session_not_found_error() {
        let err = QuireError::session_not_found("s-1");
        assert_eq!(err.code(), ErrorCode::SesNotFound);
        assert!(err.to_string().contains("s-1"));
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_unknown_tool_error() {
        let err = QuireError::unknown_tool("summarize");
        assert_eq!(err.code(), ErrorCode::ToolUnknown);
        assert!(err.to_string().contains("summarize"));
    }

    #[test]
    fn test_from_http_status() {
        assert_eq!(
            QuireError::from_http_status(404, "model 'x' not found").code(),
            ErrorCode::LlmConnectionFailed
        );
        assert_eq!(QuireError::from_http_status(504, "").code(), ErrorCode::NetTimeout);
        assert_eq!(
            QuireError::from_http_status(500, "boom").code(),
            ErrorCode::LlmGenerationFailed
        );
    }

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::CfgInvalid.as_str(), "CFG_001");
        assert_eq!(ErrorCode::ToolUnknown.as_str(), "TOOL_001");
    }
}
