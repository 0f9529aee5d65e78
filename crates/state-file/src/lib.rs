use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Small persisted key-value store backed by a `KEY=VALUE` file.
///
/// Lines without a `=` are ignored on read. Writes rewrite the whole file
/// through a sibling temporary file so a crash never leaves it half written.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load a single value by key. Missing file or key yields `None`.
    pub fn load_value(&self, key: &str) -> Option<String> {
        self.load_all().remove(key)
    }

    /// Load a value and parse it as an unsigned integer.
    pub fn load_u64(&self, key: &str) -> Option<u64> {
        self.load_value(key).and_then(|v| v.parse().ok())
    }

    /// Store a single key, keeping every other entry.
    pub fn save_value(&self, key: &str, value: &str) -> Result<()> {
        let mut state = self.load_all();
        state.insert(key.to_string(), value.to_string());
        self.save_all(&state)
    }

    pub fn load_all(&self) -> BTreeMap<String, String> {
        let Ok(contents) = fs::read_to_string(&self.path) else {
            return BTreeMap::new();
        };
        contents
            .lines()
            .filter_map(|line| line.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect()
    }

    /// Rewrite the file with the given entries, sorted by key.
    pub fn save_all(&self, state: &BTreeMap<String, String>) -> Result<()> {
        let content: String = state.iter().map(|(k, v)| format!("{k}={v}\n")).collect();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}
