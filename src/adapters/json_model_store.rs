//! File-backed model store: one JSON snapshot per model.

use crate::domain::error::MltraderError;
use crate::domain::model::ModelSnapshot;
use crate::ports::model_store_port::ModelStore;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct JsonModelStore {
    dir: PathBuf,
}

impl JsonModelStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// `<dir>/<model>_model.json`
    pub fn path_for(&self, model: &str) -> PathBuf {
        self.dir.join(format!("{}_model.json", model))
    }
}

impl ModelStore for JsonModelStore {
    fn save(&self, snapshot: &ModelSnapshot) -> Result<(), MltraderError> {
        fs::create_dir_all(&self.dir).map_err(|e| MltraderError::ModelStore {
            reason: format!("failed to create {}: {}", self.dir.display(), e),
        })?;
        let path = self.path_for(&snapshot.model);
        let json = serde_json::to_string_pretty(snapshot).map_err(|e| MltraderError::ModelStore {
            reason: format!("failed to serialize {}: {}", snapshot.model, e),
        })?;
        fs::write(&path, json).map_err(|e| MltraderError::ModelStore {
            reason: format!("failed to write {}: {}", path.display(), e),
        })?;
        debug!(model = %snapshot.model, path = %path.display(), "model saved");
        Ok(())
    }

    fn load(&self, model: &str) -> Result<ModelSnapshot, MltraderError> {
        let path = self.path_for(model);
        let content = fs::read_to_string(&path).map_err(|e| MltraderError::ModelStore {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        serde_json::from_str(&content).map_err(|e| MltraderError::ModelStore {
            reason: format!("corrupt snapshot {}: {}", path.display(), e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{GaussianNbModel, TrainableModel};
    use ndarray::array;
    use tempfile::TempDir;

    #[test]
    fn fitted_model_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = JsonModelStore::new(dir.path().join("models"));

        let x = array![[0.0, 1.0], [0.2, 0.9], [1.0, 0.0], [0.9, 0.1]];
        let y = [0, 0, 1, 1];
        let mut model = GaussianNbModel::new();
        model.fit(&x, &y).unwrap();
        store.save(&model.snapshot().unwrap()).unwrap();
        assert!(store.path_for("gaussian_nb").exists());

        let mut restored = GaussianNbModel::new();
        restored.restore(store.load("gaussian_nb").unwrap()).unwrap();
        assert_eq!(restored.predict(&x).unwrap(), model.predict(&x).unwrap());
    }

    #[test]
    fn missing_snapshot_is_a_store_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonModelStore::new(dir.path().to_path_buf());
        let err = store.load("logistic").unwrap_err();
        assert!(matches!(err, MltraderError::ModelStore { .. }));
    }

    #[test]
    fn corrupt_snapshot_is_a_store_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonModelStore::new(dir.path().to_path_buf());
        fs::write(store.path_for("logistic"), "{not json").unwrap();
        let err = store.load("logistic").unwrap_err();
        assert!(matches!(err, MltraderError::ModelStore { .. }));
    }
}
