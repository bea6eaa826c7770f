//! Staged writer configuration.
//!
//! Settings come from code, or from the environment through
//! [`StagedWriterConfig::from_env`]; the CLI layers its flags on top.

use std::path::PathBuf;

/// Directory in which staging files are created.
pub const STAGING_DIR_ENV: &str = "STAGEFS_STAGING_DIR";
/// When truthy, staged writes to the same target run one at a time.
pub const SERIALIZE_WRITES_ENV: &str = "STAGEFS_SERIALIZE_WRITES";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedWriterConfig {
    /// Where staging files live. `None` means the platform temp directory.
    pub staging_dir: Option<PathBuf>,
    /// Serialize concurrent staged operations that target the same path.
    /// Without it the last relocation wins.
    pub serialize_same_target: bool,
}

impl StagedWriterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        StagedWriterConfig {
            staging_dir: lookup(STAGING_DIR_ENV)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            serialize_same_target: lookup(SERIALIZE_WRITES_ENV).map_or(false, |v| parse_flag(&v)),
        }
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    pub fn serialize_same_target(mut self, enabled: bool) -> Self {
        self.serialize_same_target = enabled;
        self
    }

    /// The staging directory to use, resolving the default.
    pub fn resolved_staging_dir(&self) -> PathBuf {
        self.staging_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
