//! Versioned system-prompt store
//!
//! The teaching prompt sent as the conversation's system message is an
//! immutable [`PromptConfig`] value held in a single process-wide slot,
//! swapped only through the explicit operations here. Prompt files live
//! in a configured directory, one version per file (`<version>.md` or
//! `<version>.txt`); with no directory configured a built-in prompt is
//! active under the version `builtin`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::config::PromptSettings;

/// Version name of the compiled-in default prompt.
pub const BUILTIN_VERSION: &str = "builtin";

const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a patient Python tutor embedded in a browser code editor. \
Guide the student toward the answer instead of handing it over: ask what \
they expect a line to do, point at the relevant concept, and only show \
corrected code after they have seen why theirs fails. Keep answers short, \
concrete, and tied to the code the student shared. When an error message \
is involved, explain how to read it before explaining how to fix it.";

/// An immutable snapshot of one system prompt.
#[derive(Debug, Clone, Serialize)]
pub struct PromptConfig {
    pub version: String,
    #[serde(skip)]
    pub content: String,
    pub loaded_at: DateTime<Utc>,
}

impl PromptConfig {
    fn builtin() -> Self {
        Self {
            version: BUILTIN_VERSION.to_string(),
            content: DEFAULT_SYSTEM_PROMPT.to_string(),
            loaded_at: Utc::now(),
        }
    }
}

/// Process-wide prompt slot with explicit reload and versioning.
pub struct PromptStore {
    dir: Option<PathBuf>,
    active: RwLock<Arc<PromptConfig>>,
}

impl PromptStore {
    /// Build the store from settings, loading the initial active prompt.
    ///
    /// A configured directory that cannot be read is an error; a missing
    /// pinned version falls back to the latest with a warning.
    pub fn from_settings(settings: &PromptSettings) -> Result<Self> {
        let dir = settings.dir.clone();

        let initial = match &dir {
            Some(path) => {
                let versions = scan_dir(path)?;
                match pick_version(&versions, settings.active_version.as_deref()) {
                    Some((version, file)) => load_file(version, file)?,
                    None => {
                        tracing::warn!(
                            dir = %path.display(),
                            "Prompt directory contains no prompt files, using builtin prompt"
                        );
                        PromptConfig::builtin()
                    }
                }
            }
            None => PromptConfig::builtin(),
        };

        tracing::info!(version = %initial.version, "Active system prompt loaded");

        Ok(Self {
            dir,
            active: RwLock::new(Arc::new(initial)),
        })
    }

    /// The currently active prompt.
    pub fn active(&self) -> Arc<PromptConfig> {
        self.active.read().unwrap().clone()
    }

    /// List available version names, ascending.
    pub fn list(&self) -> Result<Vec<String>> {
        match &self.dir {
            Some(path) => Ok(scan_dir(path)?.into_keys().collect()),
            None => Ok(vec![BUILTIN_VERSION.to_string()]),
        }
    }

    /// Re-read the active version from disk.
    ///
    /// If the active version's file disappeared, the latest remaining
    /// version (or the builtin prompt) takes over.
    pub fn reload(&self) -> Result<Arc<PromptConfig>> {
        let Some(dir) = &self.dir else {
            return Ok(self.active());
        };

        let versions = scan_dir(dir)?;
        let current = self.active();

        let fresh = match pick_version(&versions, Some(&current.version)) {
            Some((version, file)) => load_file(version, file)?,
            None => {
                tracing::warn!(
                    version = %current.version,
                    "Active prompt version no longer on disk, reverting to builtin"
                );
                PromptConfig::builtin()
            }
        };

        self.swap(fresh)
    }

    /// Make `version` the active prompt.
    pub fn activate(&self, version: &str) -> Result<Arc<PromptConfig>> {
        if version == BUILTIN_VERSION {
            return self.swap(PromptConfig::builtin());
        }

        let Some(dir) = &self.dir else {
            anyhow::bail!("Unknown prompt version: {}", version);
        };

        let versions = scan_dir(dir)?;
        let file = versions
            .get(version)
            .with_context(|| format!("Unknown prompt version: {}", version))?;

        self.swap(load_file(version, file)?)
    }

    fn swap(&self, config: PromptConfig) -> Result<Arc<PromptConfig>> {
        let config = Arc::new(config);
        *self.active.write().unwrap() = config.clone();
        tracing::info!(version = %config.version, "System prompt activated");
        Ok(config)
    }
}

/// Map of version name -> prompt file path.
fn scan_dir(dir: &Path) -> Result<BTreeMap<String, PathBuf>> {
    let mut versions = BTreeMap::new();

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read prompt directory {}", dir.display()))?;

    for entry in entries {
        let path = entry?.path();
        let is_prompt = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == "md" || e == "txt")
            .unwrap_or(false);
        if !is_prompt {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            versions.insert(stem.to_string(), path.clone());
        }
    }

    Ok(versions)
}

/// Preferred version if present, else the greatest one.
fn pick_version<'a>(
    versions: &'a BTreeMap<String, PathBuf>,
    preferred: Option<&str>,
) -> Option<(&'a str, &'a Path)> {
    if let Some(name) = preferred {
        if let Some((version, path)) = versions.get_key_value(name) {
            return Some((version.as_str(), path.as_path()));
        }
        if name != BUILTIN_VERSION {
            tracing::warn!(version = %name, "Pinned prompt version not found, falling back to latest");
        }
    }

    versions
        .iter()
        .next_back()
        .map(|(version, path)| (version.as_str(), path.as_path()))
}

fn load_file(version: &str, path: &Path) -> Result<PromptConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read prompt file {}", path.display()))?;

    Ok(PromptConfig {
        version: version.to_string(),
        content,
        loaded_at: Utc::now(),
    })
}
