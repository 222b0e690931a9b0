//! Terminal outcomes reported by workers.
//!
//! Failures are carried as data (`success == false`) rather than as
//! errors, so every outcome can be delivered to observers unchanged.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Terminal outcome of a copy or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
}

impl Outcome {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Terminal outcome of an image validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub success: bool,
    pub message: String,
    /// Name of the validated image.
    pub image_name: String,
    /// Path of the tar archive produced or located during validation.
    pub tar_path: Option<PathBuf>,
}

impl ValidationOutcome {
    pub fn succeeded(
        message: impl Into<String>,
        image_name: impl Into<String>,
        tar_path: Option<PathBuf>,
    ) -> Self {
        Self {
            success: true,
            message: message.into(),
            image_name: image_name.into(),
            tar_path,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            image_name: String::new(),
            tar_path: None,
        }
    }
}

/// Terminal outcome of an image info extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfoOutcome {
    pub success: bool,
    pub image_name: String,
    pub android_version: String,
    /// Empty on success.
    pub error_message: String,
}

impl ImageInfoOutcome {
    pub fn succeeded(image_name: impl Into<String>, android_version: impl Into<String>) -> Self {
        Self {
            success: true,
            image_name: image_name.into(),
            android_version: android_version.into(),
            error_message: String::new(),
        }
    }

    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            image_name: String::new(),
            android_version: String::new(),
            error_message: error_message.into(),
        }
    }
}

/// Terminal outcome of the combined extract-then-validate step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageProcessOutcome {
    pub success: bool,
    pub message: String,
    pub image_name: String,
    pub android_version: String,
    pub tar_path: Option<PathBuf>,
}

impl ImageProcessOutcome {
    pub fn succeeded(
        message: impl Into<String>,
        image_name: impl Into<String>,
        android_version: impl Into<String>,
        tar_path: Option<PathBuf>,
    ) -> Self {
        Self {
            success: true,
            message: message.into(),
            image_name: image_name.into(),
            android_version: android_version.into(),
            tar_path,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            image_name: String::new(),
            android_version: String::new(),
            tar_path: None,
        }
    }
}
