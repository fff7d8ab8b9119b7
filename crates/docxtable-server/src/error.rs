use docxtable_core::TableError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::codec::CodecError;

/// Tool operation error type
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("Failed to read document {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("File size ({size_mb:.1}MB) of {} exceeds limit ({limit_mb}MB)", .path.display())]
    FileTooLarge {
        path: PathBuf,
        size_mb: f64,
        limit_mb: u64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Machine-readable code reported to callers
    pub fn code(&self) -> &'static str {
        match self {
            ToolError::DocumentNotFound(_) => "NOT_FOUND",
            ToolError::Table(e) => e.code(),
            ToolError::Malformed { .. } => "DATA_FORMAT_ERROR",
            ToolError::FileTooLarge { .. } => "FILE_SIZE_ERROR",
            ToolError::Io(_) => "IO_ERROR",
        }
    }

    /// Attach the document path to a codec failure
    pub fn from_codec(path: impl Into<PathBuf>, err: CodecError) -> Self {
        match err {
            CodecError::Io(e) => ToolError::Io(e),
            CodecError::Parse(e) => ToolError::Malformed {
                path: path.into(),
                reason: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
    Warning,
}

/// Result of a tool operation that can be reported to a caller
pub trait ToolOutput: Serialize {
    /// Human-readable summary of what happened
    fn message(&self) -> String;

    /// Completed, but the caller asked for something that was a no-op
    fn is_warning(&self) -> bool {
        false
    }
}

/// Uniform envelope returned to tool callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub status: ResponseStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl ToolResponse {
    pub fn success(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
            data,
            error_code: None,
        }
    }

    pub fn warning(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            status: ResponseStatus::Warning,
            message: message.into(),
            data,
            error_code: None,
        }
    }

    pub fn error(err: &ToolError) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: err.to_string(),
            data: None,
            error_code: Some(err.code().to_string()),
        }
    }

    /// Wrap an operation result in the response envelope
    pub fn from_result<T: ToolOutput>(result: Result<T, ToolError>) -> Self {
        let output = match result {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!(code = err.code(), "Tool call failed: {}", err);
                return Self::error(&err);
            }
        };

        let data = match serde_json::to_value(&output) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize tool output: {}", e);
                return Self {
                    status: ResponseStatus::Error,
                    message: format!("Failed to serialize result: {}", e),
                    data: None,
                    error_code: Some("SERIALIZATION_ERROR".to_string()),
                };
            }
        };

        if output.is_warning() {
            Self::warning(output.message(), Some(data))
        } else {
            Self::success(output.message(), Some(data))
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}
