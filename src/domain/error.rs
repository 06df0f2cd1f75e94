//! Domain error types.

/// Top-level error type for mltrader.
#[derive(Debug, thiserror::Error)]
pub enum MltraderError {
    #[error("model {model} is not fitted")]
    InvalidState { model: String },

    #[error("data alignment error: {reason}")]
    DataAlignment { reason: String },

    #[error("training failed for {model}: {reason}")]
    ModelTraining { model: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("insufficient data: have {bars} bars, need {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("invalid data: {reason}")]
    InvalidData { reason: String },

    #[error("data source error: {reason}")]
    Data { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error("model store error: {reason}")]
    ModelStore { reason: String },

    #[error("worker pool error: {reason}")]
    WorkerPool { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MltraderError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        MltraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&MltraderError> for std::process::ExitCode {
    fn from(err: &MltraderError) -> Self {
        let code: u8 = match err {
            MltraderError::Io(_)
            | MltraderError::Report { .. }
            | MltraderError::ModelStore { .. } => 1,
            MltraderError::ConfigParse { .. }
            | MltraderError::ConfigMissing { .. }
            | MltraderError::ConfigInvalid { .. } => 2,
            MltraderError::Data { .. } => 3,
            MltraderError::InvalidState { .. }
            | MltraderError::DataAlignment { .. }
            | MltraderError::ModelTraining { .. }
            | MltraderError::WorkerPool { .. } => 4,
            MltraderError::InsufficientData { .. } | MltraderError::InvalidData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
