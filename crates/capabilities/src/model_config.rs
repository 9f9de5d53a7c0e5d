//! YAML catalog loading: read every `*.yaml` file in a directory, skip and
//! warn on any file that fails to parse rather than aborting startup.

use crate::types::ModelCapability;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// One model's catalog file, deserialized directly as a `ModelCapability`.
pub fn load_from_directory<P: AsRef<Path>>(config_dir: P) -> Vec<ModelCapability> {
    let dir = config_dir.as_ref();
    let mut models = Vec::new();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, path = ?dir, "model catalog directory not found, using compiled-in defaults");
            return models;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("yaml") {
            continue;
        }
        match load_one(&path) {
            Ok(model) => {
                debug!(model = %model.model_id, path = ?path, "loaded model catalog file");
                models.push(model);
            }
            Err(e) => warn!(error = %e, path = ?path, "failed to parse model catalog file, skipping"),
        }
    }

    models.sort_by(|a, b| a.model_id.cmp(&b.model_id));
    models
}

fn load_one(path: &Path) -> Result<ModelCapability, crate::error::CapabilitiesError> {
    let contents = fs::read_to_string(path).map_err(|e| crate::error::CapabilitiesError::CatalogIo {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_yaml::from_str(&contents).map_err(|e| crate::error::CapabilitiesError::CatalogParse {
        path: path.display().to_string(),
        source: e,
    })
}

/// Loads the catalog directory if present and non-empty, otherwise falls
/// back to the compiled-in hrrr/gfs/nbm defaults.
pub fn load_or_default<P: AsRef<Path>>(config_dir: P) -> Vec<ModelCapability> {
    let loaded = load_from_directory(config_dir);
    if loaded.is_empty() {
        crate::catalog::default_models()
    } else {
        loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_directory_falls_back_to_defaults() {
        let models = load_or_default("/nonexistent/path/does-not-exist");
        let ids: Vec<&str> = models.iter().map(|m| m.model_id.as_str()).collect();
        assert_eq!(ids, vec!["gfs", "hrrr", "nbm"]);
    }

    #[test]
    fn malformed_file_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join("broken.yaml")).unwrap();
        writeln!(f, "not: [valid, model: capability").unwrap();
        let models = load_from_directory(dir.path());
        assert!(models.is_empty());
    }
}
