//! Pipeline configuration.

use serde::{Deserialize, Serialize};

/// How per-slide failures are handled during assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Abort the whole build on the first per-slide error.
    #[default]
    FailFast,
    /// Keep going and report every per-slide error at the end.
    Collect,
}

/// Configuration for one deck build.
///
/// All fields have defaults so a manifest may specify only what it cares
/// about; `with_*` builders cover programmatic use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Declared number of slides the finished deck must contain.
    /// `None` skips the count gate.
    pub expected_count: Option<usize>,

    /// Minimum vertical gap between consecutively declared elements,
    /// in canvas units.
    pub min_gap: f64,

    /// Canvas width in normalized units.
    pub canvas_width: f64,

    /// Canvas height in normalized units.
    pub canvas_height: f64,

    /// Character ceiling for speaker notes, counted after normalization.
    pub notes_char_limit: usize,

    /// When true, a slide without notes is an error instead of a warning.
    pub require_notes: bool,

    /// Per-slide failure handling.
    pub policy: ErrorPolicy,

    /// Minimum plausible artifact size in bytes; smaller outputs are
    /// rejected as suspicious.
    pub min_artifact_bytes: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            expected_count: None,
            min_gap: 0.02,
            canvas_width: 1.0,
            canvas_height: 1.0,
            notes_char_limit: 8000,
            require_notes: false,
            policy: ErrorPolicy::FailFast,
            min_artifact_bytes: 1024,
        }
    }
}

impl PipelineConfig {
    /// Create a configuration with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the number of slides the deck must end up with.
    pub fn with_expected_count(mut self, count: usize) -> Self {
        self.expected_count = Some(count);
        self
    }

    /// Set the minimum vertical gap between stacked elements.
    pub fn with_min_gap(mut self, gap: f64) -> Self {
        self.min_gap = gap;
        self
    }

    /// Set the canvas dimensions.
    pub fn with_canvas(mut self, width: f64, height: f64) -> Self {
        self.canvas_width = width;
        self.canvas_height = height;
        self
    }

    /// Set the notes character ceiling.
    pub fn with_notes_char_limit(mut self, limit: usize) -> Self {
        self.notes_char_limit = limit;
        self
    }

    /// Treat missing notes as an error.
    pub fn with_required_notes(mut self, required: bool) -> Self {
        self.require_notes = required;
        self
    }

    /// Set the per-slide failure policy.
    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the minimum plausible artifact size.
    pub fn with_min_artifact_bytes(mut self, bytes: u64) -> Self {
        self.min_artifact_bytes = bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.expected_count, None);
        assert_eq!(config.notes_char_limit, 8000);
        assert_eq!(config.policy, ErrorPolicy::FailFast);
        assert!(!config.require_notes);
    }

    #[test]
    fn test_builders() {
        let config = PipelineConfig::new()
            .with_expected_count(40)
            .with_min_gap(0.05)
            .with_policy(ErrorPolicy::Collect);

        assert_eq!(config.expected_count, Some(40));
        assert_eq!(config.min_gap, 0.05);
        assert_eq!(config.policy, ErrorPolicy::Collect);
    }

    #[test]
    fn test_partial_manifest_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"expected_count": 3, "policy": "collect"}"#).unwrap();
        assert_eq!(config.expected_count, Some(3));
        assert_eq!(config.policy, ErrorPolicy::Collect);
        assert_eq!(config.canvas_height, 1.0);
    }
}
