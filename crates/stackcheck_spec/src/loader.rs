//! Specification loading and caching.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::error::{SpecError, SpecResult};
use crate::models::Specification;

/// Parse a specification from JSON text.
pub fn from_json_str(text: &str) -> SpecResult<Specification> {
    let spec: Specification = serde_json::from_str(text)?;
    debug!(
        "Parsed specification {} with {} resource types and {} property types",
        spec.version,
        spec.resource_types.len(),
        spec.property_types.len()
    );
    Ok(spec)
}

/// Load a specification from a JSON file.
pub fn from_file(path: &Path) -> SpecResult<Specification> {
    if !path.exists() {
        return Err(SpecError::NotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    let spec = from_json_str(&content)?;
    info!("Loaded specification {} from {:?}", spec.version, path);
    Ok(spec)
}

/// Process-wide store of loaded specifications keyed by region and version.
///
/// Files are looked up as `<root>/<region>/<version>.json`. Loaded
/// specifications are immutable and shared between runs.
#[derive(Debug)]
pub struct SpecificationCache {
    root: PathBuf,
    entries: Mutex<HashMap<(String, String), Arc<Specification>>>,
}

impl SpecificationCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the specification file for a region and version.
    pub fn path_for(&self, region: &str, version: &str) -> PathBuf {
        self.root.join(region).join(format!("{}.json", version))
    }

    /// Get a specification, loading it from disk on first use.
    pub fn get(&self, region: &str, version: &str) -> SpecResult<Arc<Specification>> {
        let key = (region.to_string(), version.to_string());
        if let Some(spec) = self.lock().get(&key) {
            debug!("Specification cache hit for {} {}", region, version);
            return Ok(Arc::clone(spec));
        }

        let spec = Arc::new(from_file(&self.path_for(region, version))?);
        let mut entries = self.lock();
        let entry = entries.entry(key).or_insert(spec);
        Ok(Arc::clone(entry))
    }

    /// Store an already loaded specification.
    pub fn insert(&self, region: &str, version: &str, spec: Specification) -> Arc<Specification> {
        let spec = Arc::new(spec);
        self.lock().insert(
            (region.to_string(), version.to_string()),
            Arc::clone(&spec),
        );
        spec
    }

    pub fn contains(&self, region: &str, version: &str) -> bool {
        self.lock()
            .contains_key(&(region.to_string(), version.to_string()))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        debug!("Clearing specification cache");
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), Arc<Specification>>> {
        // Entries are inserted whole; a poisoned map is still consistent.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
