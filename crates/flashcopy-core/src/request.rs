//! Operation request types.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The kind of operation a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Copy,
    Delete,
    ValidateImage,
    ExtractInfo,
    ExtractAndValidate,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy => write!(f, "Copy"),
            Self::Delete => write!(f, "Delete"),
            Self::ValidateImage => write!(f, "Validate image"),
            Self::ExtractInfo => write!(f, "Extract image info"),
            Self::ExtractAndValidate => write!(f, "Extract and validate image"),
        }
    }
}

/// A single operation to be dispatched by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationRequest {
    /// Copy one file, reclaiming `temp_dir` once the copy terminates.
    Copy {
        source: PathBuf,
        destination: PathBuf,
        #[serde(default)]
        temp_dir: Option<PathBuf>,
    },
    /// Delete a file or directory tree.
    Delete { path: PathBuf },
    /// Validate a disk image.
    ValidateImage { path: PathBuf },
    /// Extract image name and Android version from a disk image.
    ExtractInfo { path: PathBuf },
    /// Extract image info, then validate, as one step.
    ExtractAndValidate { path: PathBuf },
}

impl OperationRequest {
    /// Create a copy request.
    pub fn copy(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        temp_dir: Option<PathBuf>,
    ) -> Self {
        Self::Copy {
            source: source.into(),
            destination: destination.into(),
            temp_dir,
        }
    }

    /// Create a delete request.
    pub fn delete(path: impl Into<PathBuf>) -> Self {
        Self::Delete { path: path.into() }
    }

    /// Create an image validation request.
    pub fn validate_image(path: impl Into<PathBuf>) -> Self {
        Self::ValidateImage { path: path.into() }
    }

    /// Create an image info extraction request.
    pub fn extract_info(path: impl Into<PathBuf>) -> Self {
        Self::ExtractInfo { path: path.into() }
    }

    /// Create a combined extract-and-validate request.
    pub fn extract_and_validate(path: impl Into<PathBuf>) -> Self {
        Self::ExtractAndValidate { path: path.into() }
    }

    /// The kind of operation this request asks for.
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Copy { .. } => OperationKind::Copy,
            Self::Delete { .. } => OperationKind::Delete,
            Self::ValidateImage { .. } => OperationKind::ValidateImage,
            Self::ExtractInfo { .. } => OperationKind::ExtractInfo,
            Self::ExtractAndValidate { .. } => OperationKind::ExtractAndValidate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_kind() {
        assert_eq!(
            OperationRequest::copy("/a", "/b", None).kind(),
            OperationKind::Copy
        );
        assert_eq!(
            OperationRequest::delete("/a").kind(),
            OperationKind::Delete
        );
        assert_eq!(
            OperationRequest::extract_and_validate("/a").kind(),
            OperationKind::ExtractAndValidate
        );
    }

    #[test]
    fn test_copy_request_serde_defaults_temp_dir() {
        let json = r#"{"Copy":{"source":"/src/a.img","destination":"/dst/b.img"}}"#;
        let request: OperationRequest = serde_json::from_str(json).unwrap();

        assert_eq!(
            request,
            OperationRequest::copy("/src/a.img", "/dst/b.img", None)
        );
    }
}
