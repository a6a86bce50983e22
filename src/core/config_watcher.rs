//! Config file change detection by modification time and content hash

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::config::AppConfig;

fn content_hash(content: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

/// Polls one config file for changes
#[derive(Debug)]
pub struct ConfigWatcher {
    path: PathBuf,
    modified: Option<SystemTime>,
    hash: Option<u64>,
}

impl ConfigWatcher {
    /// Watch `path`, treating its current contents as already loaded
    pub fn new(path: PathBuf) -> Self {
        let modified = fs::metadata(&path).and_then(|m| m.modified()).ok();
        let hash = fs::read_to_string(&path).ok().map(|c| content_hash(&c));
        Self {
            path,
            modified,
            hash,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// New config when the file changed since the last poll
    ///
    /// A touched file with identical content is not a change. A file that
    /// disappears or stops parsing keeps the current config.
    pub fn poll(&mut self) -> Option<AppConfig> {
        let modified = fs::metadata(&self.path).and_then(|m| m.modified()).ok();
        if modified.is_none() || modified == self.modified {
            return None;
        }
        self.modified = modified;

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("Failed to read {}: {}", self.path.display(), e);
                return None;
            }
        };
        let hash = content_hash(&content);
        if self.hash == Some(hash) {
            return None;
        }
        self.hash = Some(hash);

        match AppConfig::from_json(&content) {
            Ok(config) => {
                log::info!("Config {} changed, reloading", self.path.display());
                Some(config)
            }
            Err(e) => {
                log::warn!("{:#} in {}, keeping current config", e, self.path.display());
                None
            }
        }
    }
}
