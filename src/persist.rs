//! Namespaced JSON state persisted between sessions.
//!
//! The browser-storage analogue: each concern (session, per-store filters,
//! the notification log) owns one document under the state directory. A
//! corrupt or missing document degrades to "nothing persisted" rather than
//! failing startup.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct StateDir {
    root: PathBuf,
}

impl StateDir {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Platform default: `<data_dir>/makerlink`, falling back to the current
    /// directory when the platform exposes no data dir.
    pub fn default_location() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join("makerlink"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }

    /// Load a named document. Absent files are `Ok(None)`; unreadable or
    /// corrupt files are logged and also treated as absent.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading state document {}", path.display()))?;
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!("Discarding corrupt state document {}: {err}", path.display());
                Ok(None)
            }
        }
    }

    pub fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("creating state dir {}", self.root.display()))?;
        let path = self.path_for(name);
        let raw = serde_json::to_string_pretty(value)?;
        fs::write(&path, raw)
            .with_context(|| format!("writing state document {}", path.display()))?;
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.path_for(name);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("removing state document {}", path.display()))?;
        }
        Ok(())
    }

    /// Persist best-effort: a failed write is logged, never propagated. Used
    /// on hot paths where losing a preference beats failing the user action.
    pub fn save_quiet<T: Serialize>(&self, name: &str, value: &T) {
        if let Err(err) = self.save(name, value) {
            warn!("Failed to persist {name}: {err:#}");
        }
    }
}
