//! INI file configuration adapter.

use crate::domain::error::MltraderError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MltraderError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| MltraderError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, MltraderError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| MltraderError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[data]
path = data/btc_1h.csv
train_fraction = 0.75

[features]
ma_windows = 7, 14, 21
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("data", "path"),
            Some("data/btc_1h.csv".to_string())
        );
        assert_eq!(
            adapter.get_string("data", "train_fraction"),
            Some("0.75".to_string())
        );
        assert_eq!(
            adapter.get_string("features", "ma_windows"),
            Some("7, 14, 21".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_or_blank_key() {
        let adapter = FileConfigAdapter::from_string("[output]\nresults_path =\n").unwrap();
        assert_eq!(adapter.get_string("output", "results_path"), None);
        assert_eq!(adapter.get_string("output", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn values_are_returned_unparsed() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\ncommission =  not_a_number \n").unwrap();
        assert_eq!(
            adapter.get_string("backtest", "commission"),
            Some("not_a_number".to_string())
        );
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[output]\nmodels_dir = /tmp/models\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("output", "models_dir"),
            Some("/tmp/models".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/config.ini").unwrap_err();
        assert!(matches!(err, MltraderError::ConfigParse { .. }));
    }
}
