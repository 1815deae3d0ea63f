use std::path::PathBuf;

use crate::fs_util::normalize_path;

pub const DEFAULT_STACK_NAME: &str = "lambdalith-dev";
pub const DEFAULT_REGION: &str = "eu-central-1";

/// Tunables of the lambdalith deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSettings {
    pub stack_name: String,
    pub project_root: PathBuf,
    pub region: String,
    pub platform: String,
    pub architecture: String,
    pub memory_size: i64,
    pub timeout: i64,
    pub database_name: String,
}

impl Default for StackSettings {
    fn default() -> Self {
        Self {
            stack_name: DEFAULT_STACK_NAME.to_string(),
            project_root: PathBuf::from("."),
            region: DEFAULT_REGION.to_string(),
            platform: "linux/arm64".to_string(),
            architecture: "arm64".to_string(),
            memory_size: 1769,
            timeout: 5,
            database_name: "redis-database".to_string(),
        }
    }
}

impl StackSettings {
    /// Build context directory of a function under the project root.
    #[must_use]
    pub fn build_context(&self, function: &str) -> PathBuf {
        normalize_path(&self.project_root.join("functions").join(function))
    }

    /// Dockerfile of a function, relative to the project root.
    #[must_use]
    pub fn dockerfile(function: &str) -> PathBuf {
        PathBuf::from("functions").join(function).join("Dockerfile")
    }
}
