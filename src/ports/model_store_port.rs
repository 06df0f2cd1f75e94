//! Model persistence port trait.

use crate::domain::error::MltraderError;
use crate::domain::model::ModelSnapshot;

/// Port for saving and loading fitted model state.
pub trait ModelStore {
    fn save(&self, snapshot: &ModelSnapshot) -> Result<(), MltraderError>;

    fn load(&self, model: &str) -> Result<ModelSnapshot, MltraderError>;
}
