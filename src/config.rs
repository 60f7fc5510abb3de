//! JSON configuration file.
//!
//! Every key is optional. Relative paths resolve against the directory
//! holding the file, so a deployment can ship its file list next to it.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::{
    birthdays::BirthdayBook,
    data_dir::DataDir,
    error::{Error, Result},
    normalize::{DEFAULT_NOISE_PREFIX, NameCleaner},
    rate_limit::RateLimiter,
    selector::{
        DEFAULT_ATTACHABLE_PATTERNS, DEFAULT_SUMMARY_PATTERNS, FileRules, FolderBudget,
    },
    session::UserId,
};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "DOSSIER_CONFIG";
/// Environment variable holding the Gemini API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub file_list_path: PathBuf,
    /// Directory catalog paths are resolved against; the config directory
    /// when unset.
    pub document_root: Option<PathBuf>,
    pub base_folder_name: String,
    /// Label stripped from the front of names; `null` disables stripping.
    pub noise_prefix: Option<String>,
    pub summary_patterns: Vec<String>,
    pub attachable_patterns: Vec<String>,
    /// Folder display name -> `DD.MM`.
    pub birthdays: BTreeMap<String, String>,
    pub utc_offset_hours: i32,
    pub broadcast_hour: u32,
    pub broadcast_minute: u32,
    pub limits: Limits,
    pub whitelisted_user_ids: Vec<UserId>,
    pub main_admin_id: Option<UserId>,
    pub assistant: AssistantConfig,

    #[serde(skip)]
    base_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file_list_path: PathBuf::from("all_files_utf8.txt"),
            document_root: None,
            base_folder_name: "Dok_2.5".to_string(),
            noise_prefix: Some(DEFAULT_NOISE_PREFIX.to_string()),
            summary_patterns: to_strings(DEFAULT_SUMMARY_PATTERNS),
            attachable_patterns: to_strings(DEFAULT_ATTACHABLE_PATTERNS),
            birthdays: BTreeMap::new(),
            utc_offset_hours: 3,
            broadcast_hour: 0,
            broadcast_minute: 0,
            limits: Limits::default(),
            whitelisted_user_ids: Vec::new(),
            main_admin_id: None,
            assistant: AssistantConfig::default(),
            base_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_ai_requests_per_minute: usize,
    pub max_document_size_mb_for_ai: f64,
    pub max_documents_per_folder: usize,
    pub max_total_size_mb_per_folder: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_ai_requests_per_minute: 5,
            max_document_size_mb_for_ai: 15.0,
            max_documents_per_folder: 10,
            max_total_size_mb_per_folder: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssistantProvider {
    #[default]
    Disabled,
    Gemini,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub provider: AssistantProvider,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            provider: AssistantProvider::Disabled,
            model: "gemini-2.5-flash".to_string(),
            timeout_secs: 120,
        }
    }
}

impl AssistantConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn to_strings(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|p| p.to_string()).collect()
}

impl Config {
    /// Where the configuration file is, in order of priority:
    /// 1. An explicit path (from --config)
    /// 2. The DOSSIER_CONFIG environment variable
    /// 3. `config.json` inside the data directory
    pub fn locate(explicit: Option<&Path>, data_dir: &DataDir) -> PathBuf {
        if let Some(path) = explicit {
            path.to_path_buf()
        } else if let Ok(val) = std::env::var(CONFIG_ENV) {
            PathBuf::from(val)
        } else {
            data_dir.config_file()
        }
    }

    /// Read, parse and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound {
                    kind: "configuration file",
                    name: path.display().to_string(),
                }
            } else {
                Error::Io(e)
            }
        })?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::from_json(&content, base_dir)
    }

    /// Parse configuration text whose relative paths resolve against
    /// `base_dir`.
    pub fn from_json(content: &str, base_dir: &Path) -> Result<Self> {
        let mut config: Config = serde_json::from_str(content)?;
        config.base_dir = base_dir.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_folder_name.trim().is_empty() {
            return Err(Error::Config("base_folder_name must not be empty".into()));
        }

        let limits = &self.limits;
        if limits.max_ai_requests_per_minute == 0 {
            return Err(Error::Config(
                "limits.max_ai_requests_per_minute must be > 0".into(),
            ));
        }
        if limits.max_documents_per_folder == 0 {
            return Err(Error::Config(
                "limits.max_documents_per_folder must be > 0".into(),
            ));
        }
        for (key, value) in [
            ("max_document_size_mb_for_ai", limits.max_document_size_mb_for_ai),
            ("max_total_size_mb_per_folder", limits.max_total_size_mb_per_folder),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::Config(format!("limits.{key} must be > 0")));
            }
        }

        if !(-14..=14).contains(&self.utc_offset_hours) {
            return Err(Error::Config(
                "utc_offset_hours must be within [-14, 14]".into(),
            ));
        }
        if self.broadcast_hour > 23 || self.broadcast_minute > 59 {
            return Err(Error::Config(format!(
                "broadcast time {:02}:{:02} is not a time of day",
                self.broadcast_hour, self.broadcast_minute
            )));
        }

        // Compile once to surface bad patterns and dates at load time.
        self.file_rules()?;
        self.name_cleaner()?;
        self.birthday_book()?;
        Ok(())
    }

    /// Directory relative paths are resolved against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn file_list(&self) -> PathBuf {
        self.resolve(&self.file_list_path)
    }

    pub fn document_root(&self) -> PathBuf {
        match &self.document_root {
            Some(root) => self.resolve(root),
            None => self.base_dir.clone(),
        }
    }

    pub fn name_cleaner(&self) -> Result<NameCleaner> {
        NameCleaner::new(self.noise_prefix.as_deref())
    }

    pub fn file_rules(&self) -> Result<FileRules> {
        FileRules::new(&self.summary_patterns, &self.attachable_patterns)
    }

    pub fn folder_budget(&self) -> FolderBudget {
        FolderBudget {
            max_count: self.limits.max_documents_per_folder,
            max_total_mb: self.limits.max_total_size_mb_per_folder,
        }
    }

    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::per_minute(self.limits.max_ai_requests_per_minute)
    }

    pub fn birthday_book(&self) -> Result<BirthdayBook> {
        BirthdayBook::new(
            &self.birthdays,
            self.utc_offset_hours,
            self.broadcast_hour,
            self.broadcast_minute,
        )
    }
}

/// The Gemini API key from the environment, if set and non-empty.
pub fn gemini_api_key() -> Option<String> {
    std::env::var(GEMINI_API_KEY_ENV)
        .ok()
        .filter(|key| !key.trim().is_empty())
}
