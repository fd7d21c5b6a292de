//! Sync configuration

use crate::{ImportError, Result};
use serde::{Deserialize, Serialize};

/// Extensions accepted when no allow-list is configured
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    // Images
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "svg", "avif", "heic", "ico", "tif", "tiff",
    // Video
    "mp4", "webm", "mov", "m4v",
];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Asset extensions to import, compared case-insensitively
    #[serde(default = "default_supported_extensions")]
    pub supported_extensions: Vec<String>,

    /// Assets reconciled at the same time
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Lifetime of the run lease; renewed while the run makes progress
    #[serde(default = "default_lease_ttl_secs")]
    pub lease_ttl_secs: i64,

    /// Delete stored images whose asset no longer exists on disk
    #[serde(default)]
    pub prune_missing: bool,

    /// Follow symbolic links under `images/`
    #[serde(default)]
    pub follow_links: bool,
}

impl SyncConfig {
    /// Whether an asset extension is on the allow-list
    pub fn is_supported(&self, ext: &str) -> bool {
        self.supported_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.supported_extensions.is_empty() {
            return Err(ImportError::InvalidConfig(
                "supported_extensions must not be empty".to_string(),
            ));
        }

        if self.concurrency == 0 {
            return Err(ImportError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }

        if self.lease_ttl_secs < 3 {
            return Err(ImportError::InvalidConfig(format!(
                "lease_ttl_secs must be at least 3, got {}",
                self.lease_ttl_secs
            )));
        }

        Ok(())
    }
}

// Default values
fn default_supported_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|ext| (*ext).to_string()).collect()
}

fn default_concurrency() -> usize {
    4
}

fn default_lease_ttl_secs() -> i64 {
    300
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            supported_extensions: default_supported_extensions(),
            concurrency: default_concurrency(),
            lease_ttl_secs: default_lease_ttl_secs(),
            prune_missing: false,
            follow_links: false,
        }
    }
}
