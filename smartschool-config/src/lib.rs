//! # Smartschool Configuration Module
//!
//! This module provides configuration management for the Smartschool client:
//! - Loading configuration from YAML (or JSON) files
//! - Merging with an embedded default configuration
//! - Environment variable overrides
//! - Transparent decryption of the stored access code
//! - Thread-safe singleton access pattern
//!
//! ## Usage
//!
//! ```no_run
//! use smartschool_config::get_config;
//!
//! let config = get_config();
//! let endpoint = config.get_api_endpoint()?;
//! let accesscode = config.get_accesscode()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Result, anyhow};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tracing::{debug, info};

pub mod encryption;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("smartschool.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load Smartschool configuration"));
}

const ENV_CONFIG_DIR: &str = "SMARTSCHOOL_CONFIG";
const ENV_PREFIX: &str = "SMARTSCHOOL_CONFIG__";
const CONFIG_DIR_NAME: &str = ".smartschool";
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Namespace `tns` utilisé par défaut dans les enveloppes SOAP
pub const DEFAULT_SERVICE_NAMESPACE: &str = "https://example.smartschool.be/Webservices/V3";
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";

/// Configuration manager for the Smartschool client
///
/// Values are stored as a YAML tree whose keys are all lower-cased, so a
/// JSON file written as `{"apiEndpoint": ..., "accesscode": ...}` is read
/// through the `apiendpoint` / `accesscode` paths.
///
/// A configuration loaded from a directory ([`Config::load_config`]) is
/// written back on every [`Config::set_value`]. A configuration loaded from
/// an explicit file or from a string is read-only on disk.
#[derive(Debug)]
pub struct Config {
    path: Option<PathBuf>,
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            data: Mutex::new(self.data().clone()),
        }
    }
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> PathBuf {
        if !directory.is_empty() {
            return PathBuf::from(directory);
        }

        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return PathBuf::from(env_path);
        }

        if Path::new(CONFIG_DIR_NAME).exists() {
            return PathBuf::from(CONFIG_DIR_NAME);
        }

        if let Some(home) = home_dir() {
            let home_config = home.join(CONFIG_DIR_NAME);
            if home_config.exists() {
                return home_config;
            }
        }

        PathBuf::from(CONFIG_DIR_NAME)
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
        }

        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;

        fs::read_dir(path)?;

        Ok(())
    }

    /// Loads the configuration from a directory
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `SMARTSCHOOL_CONFIG` environment variable
    /// 3. `.smartschool` in the current directory
    /// 4. `.smartschool` in the user's home directory
    ///
    /// The embedded defaults are merged with `config.yaml` from that
    /// directory (if present), `SMARTSCHOOL_CONFIG__*` overrides are applied,
    /// and the merged result is saved back.
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::find_config_dir(directory);
        Self::validate_config_dir(&config_dir)?;
        info!(config_dir = %config_dir.display(), "Using config directory");

        let path = config_dir.join(CONFIG_FILE_NAME);
        let external = match fs::read(&path) {
            Ok(data) => {
                info!(config_file = %path.display(), "Loaded config file");
                Some(serde_yaml::from_slice::<Value>(&data)?)
            }
            Err(_) => {
                info!(config_file = %path.display(), "Config file not found, using default embedded config");
                None
            }
        };

        let config = Config {
            path: Some(path),
            data: Mutex::new(Self::build(external.as_ref())?),
        };
        config.save()?;
        Ok(config)
    }

    /// Loads one explicit configuration file (YAML or JSON) over the defaults
    ///
    /// The file is never written back.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)
            .map_err(|e| anyhow!("Cannot read config file {}: {}", path.display(), e))?;
        let external: Value = serde_yaml::from_slice(&data)?;
        info!(config_file = %path.display(), "Loaded config file");

        Ok(Config {
            path: None,
            data: Mutex::new(Self::build(Some(&external))?),
        })
    }

    /// Builds an in-memory configuration from a YAML (or JSON) document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let external: Value = serde_yaml::from_str(yaml)?;
        Ok(Config {
            path: None,
            data: Mutex::new(Self::build(Some(&external))?),
        })
    }

    fn build(external: Option<&Value>) -> Result<Value> {
        let mut value = Self::lower_keys_value(serde_yaml::from_str(DEFAULT_CONFIG)?);
        if let Some(external) = external {
            merge_yaml(&mut value, &Self::lower_keys_value(external.clone()));
        }
        Self::apply_env_overrides(&mut value, env::vars());
        Ok(value)
    }

    fn data(&self) -> MutexGuard<'_, Value> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Chemin du fichier sauvegardé, `None` pour une configuration en lecture seule
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Saves the current configuration to its config.yaml file
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            debug!("Read-only configuration, nothing saved");
            return Ok(());
        };
        let yaml = serde_yaml::to_string(&*self.data())?;
        fs::write(path, yaml)?;
        Ok(())
    }

    /// Sets a configuration value at the specified path and saves it
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["service", "namespace"]`)
    /// * `value` - The YAML value to set
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        Self::set_value_internal(&mut self.data(), path, value)?;
        self.save()
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key_value = Value::String(path[0].to_lowercase());
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Gets a configuration value at the specified path
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        Self::get_value_internal(&self.data(), path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                match map.get(&Value::String(key.to_lowercase())) {
                    Some(next) => current = next,
                    None => return Err(anyhow!("Path {} does not exist", path[..=i].join("."))),
                }
            } else {
                return Err(anyhow!("Path {} is not a mapping", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    fn apply_env_overrides(config: &mut Value, vars: impl IntoIterator<Item = (String, String)>) {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                let key_path = stripped.split("__").collect::<Vec<_>>();
                let _ = Self::set_value_internal(config, &key_path, Self::convert_env_value(&value));
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    let key = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    new_map.insert(key, Self::lower_keys_value(v));
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    fn get_string(&self, path: &[&str]) -> Option<String> {
        match self.get_value(path) {
            Ok(Value::String(s)) => Some(s.trim().to_string()),
            Ok(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    /// URL du point d'accès SOAP (`apiEndpoint`)
    ///
    /// # Errors
    ///
    /// Retourne une erreur si l'URL n'est pas configurée
    pub fn get_api_endpoint(&self) -> Result<String> {
        self.get_string(&["apiendpoint"])
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("apiEndpoint is not configured"))
    }

    pub fn set_api_endpoint(&self, endpoint: &str) -> Result<()> {
        self.set_value(&["apiendpoint"], Value::String(endpoint.to_string()))
    }

    /// Code d'accès aux webservices, déchiffré si nécessaire
    ///
    /// # Errors
    ///
    /// Retourne une erreur si le code n'est pas configuré ou ne peut pas
    /// être déchiffré sur cette machine
    pub fn get_accesscode(&self) -> Result<String> {
        let stored = self
            .get_string(&["accesscode"])
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("accesscode is not configured"))?;
        encryption::get_secret(&stored)
    }

    /// Enregistre le code d'accès sous forme chiffrée
    pub fn set_accesscode(&self, accesscode: &str) -> Result<()> {
        let encrypted = encryption::encrypt_secret(accesscode)?;
        self.set_value(&["accesscode"], Value::String(encrypted))
    }

    /// Namespace `tns` des enveloppes SOAP
    pub fn get_service_namespace(&self) -> String {
        self.get_string(&["service", "namespace"])
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SERVICE_NAMESPACE.to_string())
    }

    /// Délai maximal d'une requête HTTP
    ///
    /// `None` (valeur absente ou 0) signifie attendre indéfiniment.
    pub fn get_request_timeout(&self) -> Option<Duration> {
        let secs = match self.get_value(&["service", "timeout_secs"]) {
            Ok(Value::Number(n)) => n.as_u64(),
            Ok(Value::String(s)) => s.trim().parse::<u64>().ok(),
            _ => None,
        }?;
        (secs > 0).then(|| Duration::from_secs(secs))
    }

    /// Récupère le niveau de log minimum depuis la configuration
    pub fn get_log_min_level(&self) -> String {
        self.get_string(&["logger", "min_level"])
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_MIN_LEVEL.to_string())
    }

    /// Définit le niveau de log minimum dans la configuration
    pub fn set_log_min_level(&self, level: &str) -> Result<()> {
        self.set_value(&["logger", "min_level"], Value::String(level.to_string()))
    }
}

/// Returns the global configuration instance
///
/// The instance is loaded lazily on first access, see [`Config::load_config`].
///
/// # Panics
///
/// Panics if the configuration directory cannot be created or the
/// configuration file is not valid YAML.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Merges external YAML configuration into default configuration
///
/// Mappings are merged key by key; scalars and sequences from `external`
/// replace the default value.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml_str("{}").unwrap();
        assert!(config.get_api_endpoint().is_err());
        assert!(config.get_accesscode().is_err());
        assert_eq!(config.get_service_namespace(), DEFAULT_SERVICE_NAMESPACE);
        assert_eq!(config.get_request_timeout(), None);
        assert_eq!(config.get_log_min_level(), "INFO");
    }

    #[test]
    fn test_json_config_with_camel_case_keys() {
        let config = Config::from_yaml_str(
            r#"{"apiEndpoint": "https://school.smartschool.be/Webservices/V3", "accesscode": "secret"}"#,
        )
        .unwrap();

        assert_eq!(
            config.get_api_endpoint().unwrap(),
            "https://school.smartschool.be/Webservices/V3"
        );
        assert_eq!(config.get_accesscode().unwrap(), "secret");
    }

    #[test]
    fn test_nested_values_merge_with_defaults() {
        let config = Config::from_yaml_str("service:\n  timeout_secs: 15\n").unwrap();

        assert_eq!(config.get_request_timeout(), Some(Duration::from_secs(15)));
        // La clé sœur par défaut est conservée
        assert_eq!(config.get_service_namespace(), DEFAULT_SERVICE_NAMESPACE);
    }

    #[test]
    fn test_env_overrides() {
        let mut value = Config::lower_keys_value(serde_yaml::from_str(DEFAULT_CONFIG).unwrap());
        Config::apply_env_overrides(
            &mut value,
            vec![
                ("SMARTSCHOOL_CONFIG__SERVICE__TIMEOUT_SECS".to_string(), "30".to_string()),
                ("OTHER_VARIABLE".to_string(), "ignored".to_string()),
            ],
        );

        let timeout = Config::get_value_internal(&value, &["service", "timeout_secs"]).unwrap();
        assert_eq!(timeout.as_u64(), Some(30));
    }

    #[test]
    fn test_missing_path() {
        let config = Config::from_yaml_str("{}").unwrap();
        let err = config.get_value(&["service", "missing"]).unwrap_err();
        assert!(err.to_string().contains("service.missing"));
    }

    #[test]
    fn test_load_config_persists_values() {
        let dir = tempfile::tempdir().unwrap();
        let dir_str = dir.path().to_string_lossy().to_string();

        let config = Config::load_config(&dir_str).unwrap();
        assert!(dir.path().join(CONFIG_FILE_NAME).exists());

        config
            .set_api_endpoint("https://school.smartschool.be/Webservices/V3")
            .unwrap();

        let reloaded = Config::load_config(&dir_str).unwrap();
        assert_eq!(
            reloaded.get_api_endpoint().unwrap(),
            "https://school.smartschool.be/Webservices/V3"
        );
    }

    #[test]
    fn test_from_file_is_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.json");
        fs::write(&file, r#"{"apiEndpoint": "https://a.example", "accesscode": "x"}"#).unwrap();

        let config = Config::from_file(&file).unwrap();
        assert!(config.path().is_none());
        config.set_log_min_level("DEBUG").unwrap();
        assert_eq!(config.get_log_min_level(), "DEBUG");

        let on_disk = fs::read_to_string(&file).unwrap();
        assert!(!on_disk.contains("DEBUG"));
    }
}
