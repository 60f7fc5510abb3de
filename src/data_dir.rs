//! On-disk home of the bot: the settings database and, unless `--config`
//! or `DOSSIER_CONFIG` point elsewhere, the configuration file.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Overrides the XDG location.
pub const DATA_DIR_ENV: &str = "DOSSIER_DATA_DIR";

const XDG_PREFIX: &str = "dossier";
const SETTINGS_DB_FILE: &str = "settings.redb";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Pick the data directory and make sure it exists.
    ///
    /// `--data-dir` wins over `DOSSIER_DATA_DIR`, which wins over
    /// `$XDG_DATA_HOME/dossier`.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = match explicit {
            Some(path) => path.to_path_buf(),
            None => match std::env::var_os(DATA_DIR_ENV) {
                Some(val) if !val.is_empty() => PathBuf::from(val),
                _ => xdg_data_home()?,
            },
        };

        if !root.is_dir() {
            std::fs::create_dir_all(&root)
                .map_err(|_| Error::DataDir(root.clone()))?;
        }

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Access list and broadcast preferences.
    pub fn settings_db(&self) -> PathBuf {
        self.root.join(SETTINGS_DB_FILE)
    }

    /// Configuration file used when no other location is given.
    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }
}

fn xdg_data_home() -> Result<PathBuf> {
    xdg::BaseDirectories::with_prefix(XDG_PREFIX)
        .get_data_home()
        .ok_or_else(|| {
            Error::Config("could not determine XDG data home directory".into())
        })
}
