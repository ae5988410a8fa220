use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for background removal.
///
/// Each variant carries the path or operation it failed on, so callers (and
/// tests) can match on the failure kind instead of parsing messages. Batch
/// mode counts any of these as a per-file failure; single-file mode aborts.
#[derive(Error, Debug)]
pub enum RembgError {
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Failed to decode image {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Model error: {operation} failed")]
    Model {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save image {}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

pub type Result<T> = std::result::Result<T, RembgError>;

impl RembgError {
    pub(crate) fn model<E>(operation: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Model {
            operation: operation.into(),
            source: source.into(),
        }
    }
}

/// Convert I/O errors to filesystem errors.
///
/// Code that knows the path and operation should build `RembgError::FileSystem`
/// directly; this is the fallback for errors without that context.
impl From<std::io::Error> for RembgError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

/// Convert ONNX Runtime errors to model errors.
impl From<ort::Error> for RembgError {
    fn from(err: ort::Error) -> Self {
        Self::model("ort operation", err)
    }
}

/// Shape errors come out of tensor reshaping around inference, so they are
/// reported as model errors.
impl From<ndarray::ShapeError> for RembgError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::model("tensor shape conversion", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found_message_names_path() {
        let err = RembgError::FileNotFound {
            path: PathBuf::from("missing.png"),
        };
        assert_eq!(err.to_string(), "File not found: missing.png");
    }

    #[test]
    fn test_io_error_conversion() {
        let err: RembgError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(err, RembgError::FileSystem { .. }));
    }

    #[test]
    fn test_model_error_keeps_source() {
        let err = RembgError::model("inference", "session poisoned");
        assert_eq!(err.to_string(), "Model error: inference failed");
        assert!(std::error::Error::source(&err).is_some());
    }
}
