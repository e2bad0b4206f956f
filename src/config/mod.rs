use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use directories::BaseDirs;
use tracing::{debug, warn};

use crate::errors::ConfigError;

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    /// Defaults, then `.chartgenrc`, then `.env`, then the process environment.
    pub fn load() -> Self {
        // .env never overrides variables that are already set
        load_dotenv(dotenvy::dotenv());

        let config_path = default_config_path();
        let mut cfg = Self::from_pairs(std::iter::empty::<(String, String)>());
        cfg.config_path = config_path.clone();
        cfg.merge_rc_file(&config_path);

        for (k, v) in env::vars() {
            if is_config_key(&k) {
                cfg.inner.insert(k, v);
            }
        }
        cfg
    }

    /// Defaults overlaid with the given pairs; ignores the environment.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut inner = default_map();
        for (k, v) in pairs {
            inner.insert(k.into(), v.into());
        }
        Self { inner, config_path: default_config_path() }
    }

    fn merge_rc_file(&mut self, path: &Path) {
        if !path.exists() {
            return;
        }
        if let Ok(file) = fs::File::open(path) {
            let reader = BufReader::new(file);
            for line in reader.lines().map_while(Result::ok) {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((k, v)) = line.split_once('=') {
                    self.inner.insert(k.trim().to_string(), v.trim().to_string());
                }
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).filter(|v| !v.is_empty()).cloned()
    }

    /// CLI overrides land here, after everything else has been read.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.inner.insert(key.to_string(), value.into());
    }

    pub fn get_u64(&self, key: &str) -> Result<Option<u64>, ConfigError> {
        self.parse_with(key, |v| v.parse::<u64>().map_err(|e| e.to_string()))
    }

    pub fn get_usize(&self, key: &str) -> Result<Option<usize>, ConfigError> {
        self.parse_with(key, |v| v.parse::<usize>().map_err(|e| e.to_string()))
    }

    pub fn get_f64(&self, key: &str) -> Result<Option<f64>, ConfigError> {
        self.parse_with(key, |v| match v.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(f),
            Ok(_) => Err("not a finite number".to_string()),
            Err(e) => Err(e.to_string()),
        })
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).map(PathBuf::from)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.get_path("OUTPUT_DIR").unwrap_or_else(|| PathBuf::from("generated"))
    }

    pub fn prompts_dir(&self) -> PathBuf {
        self.get_path("PROMPTS_DIR").unwrap_or_else(|| PathBuf::from("prompts"))
    }

    fn parse_with<T>(
        &self,
        key: &str,
        parse: impl FnOnce(&str) -> Result<T, String>,
    ) -> Result<Option<T>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => parse(raw.trim()).map(Some).map_err(|reason| ConfigError::Invalid {
                key: key.to_string(),
                value: raw,
                reason,
            }),
        }
    }
}

/// A missing `.env` is normal; an unreadable or malformed one is worth a warning.
fn load_dotenv(result: Result<PathBuf, dotenvy::Error>) -> bool {
    match result {
        Ok(path) => {
            debug!("loaded {}", path.display());
            true
        }
        Err(e) if e.not_found() => false,
        Err(e) => {
            warn!("ignoring .env: {e}");
            false
        }
    }
}

fn is_config_key(k: &str) -> bool {
    // Known keys plus CHARTGEN_*/OPENAI_* for forward-compat
    const KEYS: &[&str] = &[
        "OPENAI_API_KEY",
        "API_BASE_URL",
        "DEFAULT_MODEL",
        "REQUEST_TIMEOUT",
        "TEMPERATURE",
        "TOP_P",
        "MAX_TOKENS",
        "MAX_RETRIES",
        "EXEC_TIMEOUT",
        "PYTHON_BIN",
        "MPLBACKEND",
        "OUTPUT_DIR",
        "PROMPTS_DIR",
        "LOADINGS_PATH",
        "LOADING_THRESHOLD",
    ];

    KEYS.contains(&k) || k.starts_with("CHARTGEN_") || k.starts_with("OPENAI_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("chartgen").join(".chartgenrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();

    // Paths
    m.insert("OUTPUT_DIR".into(), "generated".into());
    m.insert("PROMPTS_DIR".into(), "prompts".into());

    // Numbers
    m.insert("REQUEST_TIMEOUT".into(), "300".into());
    m.insert("MAX_RETRIES".into(), "3".into());
    m.insert("EXEC_TIMEOUT".into(), "120".into());
    m.insert("LOADING_THRESHOLD".into(), "0.2".into());

    // Strings
    m.insert("DEFAULT_MODEL".into(), "gpt-5-mini".into());
    m.insert("API_BASE_URL".into(), "default".into());
    m.insert("PYTHON_BIN".into(), "python".into());
    m.insert("MPLBACKEND".into(), "Agg".into());

    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_present() {
        let cfg = Config::from_pairs(std::iter::empty::<(&str, &str)>());
        assert_eq!(cfg.get("DEFAULT_MODEL").as_deref(), Some("gpt-5-mini"));
        assert_eq!(cfg.get_u64("MAX_RETRIES").unwrap(), Some(3));
        assert_eq!(cfg.get_f64("LOADING_THRESHOLD").unwrap(), Some(0.2));
        assert_eq!(cfg.output_dir(), PathBuf::from("generated"));
        assert!(cfg.get("LOADINGS_PATH").is_none());
    }

    #[test]
    fn invalid_numbers_are_reported_with_key() {
        let cfg = Config::from_pairs([("EXEC_TIMEOUT", "soon")]);
        let err = cfg.get_u64("EXEC_TIMEOUT").unwrap_err();
        assert!(err.to_string().contains("EXEC_TIMEOUT"));

        let cfg = Config::from_pairs([("LOADING_THRESHOLD", "NaN")]);
        assert!(cfg.get_f64("LOADING_THRESHOLD").is_err());
    }

    #[test]
    fn empty_values_read_as_unset() {
        let mut cfg = Config::from_pairs([("TEMPERATURE", "")]);
        assert!(cfg.get("TEMPERATURE").is_none());
        cfg.set("TEMPERATURE", "0.7");
        assert_eq!(cfg.get_f64("TEMPERATURE").unwrap(), Some(0.7));
    }

    #[test]
    fn malformed_dotenv_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join(".env");
        fs::write(&bad, "CHARTGEN TEST BAD LINE\n").unwrap();
        assert!(!load_dotenv(dotenvy::from_path(&bad).map(|()| bad.clone())));

        let missing = dir.path().join("absent.env");
        assert!(!load_dotenv(dotenvy::from_path(&missing).map(|()| missing.clone())));

        let good = dir.path().join("good.env");
        fs::write(&good, "CHARTGEN_TEST_DOTENV_OK=1\n").unwrap();
        assert!(load_dotenv(dotenvy::from_path(&good).map(|()| good.clone())));
    }

    #[test]
    fn rc_file_lines_are_merged() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join(".chartgenrc");
        fs::write(&rc, "# comment\nMAX_RETRIES = 5\n\nPYTHON_BIN=python3\n").unwrap();

        let mut cfg = Config::from_pairs(std::iter::empty::<(&str, &str)>());
        cfg.merge_rc_file(&rc);
        assert_eq!(cfg.get_usize("MAX_RETRIES").unwrap(), Some(5));
        assert_eq!(cfg.get("PYTHON_BIN").as_deref(), Some("python3"));
    }
}
