//! Persistent store of tuned local work sizes.
//!
//! Entries are keyed by a kernel's config id, so a tuned geometry is reused for
//! every configuration with the same data type and input shapes. A store may be
//! purely in memory or backed by a JSON file at
//! `<dir>/autotune/<kernel>/<device>.json` holding `[config_id, [x, y, z]]` pairs.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::device::NdRange;
use crate::env;
use crate::error::{KernelError, KernelResult};
use crate::profiling;

pub struct LwsTuner {
    entries: Mutex<HashMap<String, NdRange>>,
    json_path: Option<PathBuf>,
}

impl LwsTuner {
    pub fn in_memory() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            json_path: None,
        }
    }

    /// Opens the store at `path`, loading any entries already saved there.
    pub fn at_path(path: impl Into<PathBuf>) -> KernelResult<Self> {
        let tuner = Self {
            entries: Mutex::new(HashMap::new()),
            json_path: Some(path.into()),
        };
        tuner.load_from_disk()?;
        Ok(tuner)
    }

    /// Opens the store for `kernel` on `device` under `base_dir`.
    pub fn for_device(base_dir: &Path, kernel: &str, device: &str) -> KernelResult<Self> {
        let mut path = base_dir.to_path_buf();
        path.push("autotune");
        path.push(kernel);
        path.push(format!("{device}.json"));
        Self::at_path(path)
    }

    /// Store selected by `WIDTHCAT_TUNE` and `WIDTHCAT_TUNING_DIR`, `None` when tuning is off.
    pub fn from_env(kernel: &str, device: &str) -> KernelResult<Option<Self>> {
        Self::from_flags(env::tuning_enabled(), &env::tuning_dir(), kernel, device)
    }

    /// The store for `kernel` on `device` under `base_dir`, or `None` unless `enabled`.
    pub fn from_flags(
        enabled: bool,
        base_dir: &Path,
        kernel: &str,
        device: &str,
    ) -> KernelResult<Option<Self>> {
        if !enabled {
            tracing::trace!(kernel, device, "tuning store disabled");
            return Ok(None);
        }
        Self::for_device(base_dir, kernel, device).map(Some)
    }

    pub fn path(&self) -> Option<&Path> {
        self.json_path.as_deref()
    }

    pub fn lookup(&self, config_id: &str) -> Option<NdRange> {
        let found = self.entries.lock().ok()?.get(config_id).copied();
        if found.is_some() {
            profiling::cache_event("widthcat.tuning_hit");
        } else {
            profiling::cache_event("widthcat.tuning_miss");
        }
        found
    }

    /// Stores `lws` for `config_id` and flushes the file when the value changed.
    pub fn record(&self, config_id: &str, lws: NdRange) -> KernelResult<()> {
        let mut entries = self.lock()?;
        if entries.get(config_id) == Some(&lws) {
            return Ok(());
        }
        entries.insert(config_id.to_string(), lws);
        self.save_to_disk(&entries)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> KernelResult<MutexGuard<'_, HashMap<String, NdRange>>> {
        self.entries
            .lock()
            .map_err(|_| KernelError::device("tuning store mutex poisoned"))
    }

    fn load_from_disk(&self) -> KernelResult<()> {
        let Some(path) = &self.json_path else {
            return Ok(());
        };
        if !path.exists() {
            return Ok(());
        }
        let data = fs::read_to_string(path)?;
        let saved: Vec<(String, NdRange)> = serde_json::from_str(&data).map_err(|err| {
            KernelError::runtime(format!(
                "malformed tuning store {}: {err}",
                path.display()
            ))
        })?;
        let mut entries = self.lock()?;
        entries.clear();
        entries.extend(saved);
        tracing::debug!(path = %path.display(), entries = entries.len(), "loaded tuning store");
        Ok(())
    }

    fn save_to_disk(&self, entries: &HashMap<String, NdRange>) -> KernelResult<()> {
        let Some(path) = &self.json_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut sorted: Vec<(&String, &NdRange)> = entries.iter().collect();
        sorted.sort_unstable_by(|a, b| a.0.cmp(b.0));
        let payload = serde_json::to_string_pretty(&sorted)
            .map_err(|err| KernelError::runtime(format!("cannot encode tuning store: {err}")))?;
        fs::write(path, payload)?;
        tracing::debug!(path = %path.display(), entries = entries.len(), "saved tuning store");
        Ok(())
    }
}
