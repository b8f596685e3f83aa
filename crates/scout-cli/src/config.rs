//! Config file support.
//!
//! The file is TOML and uses the same camelCase keys as the crawler options:
//!
//! ```toml
//! limit = 25
//! maxDepth = 2
//! excludePatterns = ["/blog/**", "/tag/*"]
//! useSitemap = true
//! ```
//!
//! Lookup order: `--config`, then `$SCOUT_CONFIG`, then `config.toml` in the
//! platform config directory. A missing default file means "no overrides".

use anyhow::{Context, Result, anyhow};
use scout_core::CrawlerConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Crawler options read from a config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)]
pub struct FileConfig {
    pub limit: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub use_sitemap: Option<bool>,
    pub respect_robots_txt: Option<bool>,
    pub detect_spa_routes: Option<bool>,
    pub pierce_shadow_dom: Option<bool>,
    pub include_patterns: Option<Vec<String>>,
    pub exclude_patterns: Option<Vec<String>>,
    pub discover_common_paths: Option<bool>,
    pub follow_navigation: Option<bool>,
    pub max_depth: Option<u32>,
    pub include_query: Option<bool>,
    pub user_agent_token: Option<String>,
}

impl FileConfig {
    /// Load the config file.
    ///
    /// An explicit path must exist. The default location is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(anyhow!("Config file not found: {}", path.display()));
            }
            return Self::load_from(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Parse the TOML file at `path`.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// `<config dir>/config.toml` for this platform.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "outfitter", "scout")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Copy every key present in the file into `config`.
    pub fn apply(&self, config: &mut CrawlerConfig) {
        if let Some(limit) = self.limit {
            config.limit = limit;
        }
        if let Some(timeout) = self.timeout_ms {
            config.timeout_ms = timeout;
        }
        if let Some(value) = self.use_sitemap {
            config.use_sitemap = value;
        }
        if let Some(value) = self.respect_robots_txt {
            config.respect_robots_txt = value;
        }
        if let Some(value) = self.detect_spa_routes {
            config.detect_spa_routes = value;
        }
        if let Some(value) = self.pierce_shadow_dom {
            config.pierce_shadow_dom = value;
        }
        if let Some(patterns) = &self.include_patterns {
            config.include_patterns.clone_from(patterns);
        }
        if let Some(patterns) = &self.exclude_patterns {
            config.exclude_patterns.clone_from(patterns);
        }
        if let Some(value) = self.discover_common_paths {
            config.discover_common_paths = value;
        }
        if let Some(value) = self.follow_navigation {
            config.follow_navigation = value;
        }
        if let Some(depth) = self.max_depth {
            config.max_depth = depth;
        }
        if let Some(value) = self.include_query {
            config.include_query = value;
        }
        if let Some(token) = &self.user_agent_token {
            config.user_agent_token.clone_from(token);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_and_apply() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scout.toml");
        fs::write(
            &path,
            "limit = 7\nmaxDepth = 1\nexcludePatterns = [\"/blog/**\"]\nrespectRobotsTxt = false\n",
        )
        .unwrap();

        let file = FileConfig::load(Some(&path)).unwrap();
        assert_eq!(file.limit, Some(7));

        let mut config = CrawlerConfig::new("https://example.com").unwrap();
        file.apply(&mut config);
        assert_eq!(config.limit, 7);
        assert_eq!(config.max_depth, 1);
        assert!(!config.respect_robots_txt);
        assert!(config.use_sitemap);
        assert_eq!(config.exclude_patterns, vec!["/blog/**"]);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "limt = 5\n").unwrap();
        let err = FileConfig::load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = FileConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
