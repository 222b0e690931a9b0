//! Coordinator configuration types.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::OperationKind;

/// Which operation kinds compete for the coordinator's busy flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExclusionPolicy {
    /// Only a copy sets the busy flag. Copy, extraction and the combined
    /// extract-and-validate are refused while it is set; delete and
    /// validation always run.
    #[default]
    Compatible,
    /// A single operation slot: every kind is refused while busy and every
    /// kind sets the flag until its terminal result is handled.
    Exclusive,
}

impl ExclusionPolicy {
    /// Whether a request of `kind` is refused while the busy flag is set.
    pub fn is_gated(self, kind: OperationKind) -> bool {
        match self {
            Self::Exclusive => true,
            Self::Compatible => matches!(
                kind,
                OperationKind::Copy | OperationKind::ExtractInfo | OperationKind::ExtractAndValidate
            ),
        }
    }

    /// Whether dispatching `kind` sets the busy flag.
    pub fn claims_slot(self, kind: OperationKind) -> bool {
        match self {
            Self::Exclusive => true,
            Self::Compatible => kind == OperationKind::Copy,
        }
    }
}

/// Configuration for the task coordinator.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct CoordinatorConfig {
    /// Which operations are mutually exclusive.
    #[builder(default)]
    #[serde(default)]
    pub exclusion: ExclusionPolicy,

    /// Buffer size of the notification broadcast channel.
    #[builder(default = "DEFAULT_NOTIFICATION_CAPACITY")]
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,

    /// Reclaim the copy's staging directory when it terminates.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub cleanup_temp_dirs: bool,
}

/// Default buffer size of the notification channel.
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 256;

fn default_true() -> bool {
    true
}

fn default_notification_capacity() -> usize {
    DEFAULT_NOTIFICATION_CAPACITY
}

impl CoordinatorConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.notification_capacity == Some(0) {
            return Err("Notification capacity must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl CoordinatorConfig {
    /// Create a new coordinator config builder.
    pub fn builder() -> CoordinatorConfigBuilder {
        CoordinatorConfigBuilder::default()
    }

    /// Config with the given exclusion policy and defaults otherwise.
    pub fn with_exclusion(exclusion: ExclusionPolicy) -> Self {
        Self {
            exclusion,
            ..Self::default()
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            exclusion: ExclusionPolicy::Compatible,
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
            cleanup_temp_dirs: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = CoordinatorConfig::builder()
            .exclusion(ExclusionPolicy::Exclusive)
            .notification_capacity(16usize)
            .cleanup_temp_dirs(false)
            .build()
            .unwrap();

        assert_eq!(config.exclusion, ExclusionPolicy::Exclusive);
        assert_eq!(config.notification_capacity, 16);
        assert!(!config.cleanup_temp_dirs);
    }

    #[test]
    fn test_config_builder_defaults() {
        let config = CoordinatorConfig::builder().build().unwrap();
        assert_eq!(config.exclusion, ExclusionPolicy::Compatible);
        assert_eq!(config.notification_capacity, DEFAULT_NOTIFICATION_CAPACITY);
        assert!(config.cleanup_temp_dirs);
    }

    #[test]
    fn test_config_rejects_zero_capacity() {
        let result = CoordinatorConfig::builder()
            .notification_capacity(0usize)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_config_deserialize_defaults() {
        let config: CoordinatorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.exclusion, ExclusionPolicy::Compatible);
        assert!(config.cleanup_temp_dirs);
    }

    #[test]
    fn test_compatible_policy_gating() {
        let policy = ExclusionPolicy::Compatible;
        assert!(policy.is_gated(OperationKind::Copy));
        assert!(policy.is_gated(OperationKind::ExtractInfo));
        assert!(policy.is_gated(OperationKind::ExtractAndValidate));
        assert!(!policy.is_gated(OperationKind::Delete));
        assert!(!policy.is_gated(OperationKind::ValidateImage));

        assert!(policy.claims_slot(OperationKind::Copy));
        assert!(!policy.claims_slot(OperationKind::ExtractInfo));
    }

    #[test]
    fn test_exclusive_policy_gates_everything() {
        let policy = ExclusionPolicy::Exclusive;
        for kind in [
            OperationKind::Copy,
            OperationKind::Delete,
            OperationKind::ValidateImage,
            OperationKind::ExtractInfo,
            OperationKind::ExtractAndValidate,
        ] {
            assert!(policy.is_gated(kind));
            assert!(policy.claims_slot(kind));
        }
    }
}
