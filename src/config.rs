use std::{fs, path::{Path, PathBuf}};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::structures::db_err::DBError;


/// looked up in the current directory by `Config::load()`
pub const FILE_NAME: &str = "tally.json";

pub const DATA_DIR_VAR: &str = "TALLY_DATA_DIR";
pub const EXPORT_DIR_VAR: &str = "TALLY_EXPORT_DIR";

const DEFAULT_PREVIEW_ROWS: usize = 10;


/// where tables are read from and reports are written to.
///
/// resolved from, highest priority first: command line flags, environment
/// variables, `tally.json`, the defaults under the user's data directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub export_dir: PathBuf,
    /// rows shown when a table is printed
    pub preview_rows: usize,
}


impl Default for Config {
    fn default() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("tally");
        Config {
            data_dir: base.join("data"),
            export_dir: base.join("exports"),
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}


impl Config {

    /// the defaults, overlaid with `tally.json` (when present) and then the environment
    pub fn load() -> Result<Config, DBError> {
        let file = Path::new(FILE_NAME);
        let config = if file.is_file() { Config::from_file(file)? } else { Config::default() };
        Ok(config.apply_vars(|key| std::env::var(key).ok()))
    }


    /// reads a JSON config file. Keys it leaves out keep their default.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Config, DBError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| DBError::IOFailure(path.display().to_string(), e.to_string()))?;
        let config: Config = serde_json::from_slice(&bytes)
            .map_err(|e| DBError::Configuration(format!("{}: {e}", path.display())))?;

        debug!(file = %path.display(), "read configuration file");
        config.check()
    }


    /// overrides the directories with the values `lookup` finds for
    /// `TALLY_DATA_DIR` and `TALLY_EXPORT_DIR`; empty values are ignored
    pub fn apply_vars<F>(mut self, lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty()).map(PathBuf::from);
        if let Some(dir) = var(DATA_DIR_VAR) { self.data_dir = dir; }
        if let Some(dir) = var(EXPORT_DIR_VAR) { self.export_dir = dir; }
        self
    }


    pub fn with_overrides(mut self, data_dir: Option<PathBuf>, export_dir: Option<PathBuf>) -> Config {
        if let Some(dir) = data_dir { self.data_dir = dir; }
        if let Some(dir) = export_dir { self.export_dir = dir; }
        self
    }


    /// the backing file of a table inside `data_dir`
    pub fn table_path(&self, file_name: &str) -> PathBuf { self.data_dir.join(file_name) }


    fn check(self) -> Result<Config, DBError> {
        if self.preview_rows == 0 {
            return Err(DBError::Configuration(String::from("preview_rows must be at least 1")));
        }
        Ok(self)
    }
}


#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempdir::TempDir;

    use super::*;

    #[test]
    fn file_values_fill_in_over_defaults() {
        let dir = TempDir::new("config").unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(&path, r#"{ "data_dir": "/srv/ventas" }"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/ventas"));
        assert_eq!(config.export_dir, Config::default().export_dir);
        assert_eq!(config.preview_rows, DEFAULT_PREVIEW_ROWS);
    }

    #[test]
    fn bad_file_is_a_configuration_error() {
        let dir = TempDir::new("config").unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(&path, r#"{ "preview_rows": 0 }"#).unwrap();
        assert!(matches!(Config::from_file(&path), Err(DBError::Configuration(_))));

        fs::write(&path, "not json").unwrap();
        assert!(matches!(Config::from_file(&path), Err(DBError::Configuration(_))));
    }

    #[test]
    fn flags_beat_environment_beats_defaults() {
        let vars = HashMap::from([(DATA_DIR_VAR, "/env/data"), (EXPORT_DIR_VAR, " ")]);
        let config = Config::default()
            .apply_vars(|k| vars.get(k).map(|v| v.to_string()))
            .with_overrides(None, Some(PathBuf::from("/flag/out")));

        assert_eq!(config.data_dir, PathBuf::from("/env/data"));
        assert_eq!(config.export_dir, PathBuf::from("/flag/out"));
        assert_eq!(config.table_path("clientes.csv"), PathBuf::from("/env/data/clientes.csv"));
    }
}
