//! Pipeline configuration.
use serde::{Deserialize, Serialize};

/// What to do when a declared input is not needed by any requested output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnusedInputPolicy {
    /// Log a warning and record it on the pipeline.
    #[default]
    Warn,
    /// Fail construction.
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub name: Option<String>,
    pub unused_inputs: UnusedInputPolicy,
    pub warn_on_overwrite: bool,
}

impl PipelineConfig {
    pub const DEFAULT_NAME: &'static str = "pipeline";

    pub fn named(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Self::default() }
    }

    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(Self::DEFAULT_NAME)
    }
}
