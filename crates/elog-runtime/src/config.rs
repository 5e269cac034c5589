use crate::{Error, Result};
use elog_discovery::{
    DEFAULT_EXTENSION, DEFAULT_ROOT_BINARY, DEFAULT_ROOT_TYPE, DEFAULT_SKIP_PREFIXES,
    DiscoveryOptions, MarkerNames,
};
use elog_store::{DEFAULT_COLLECTION, DEFAULT_PORT, StoreSettings};
use elog_types::IdMatching;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Resolve the configuration directory based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. ELOG_PATH environment variable (with tilde expansion)
/// 3. XDG config directory
/// 4. ~/.elog (fallback for systems without XDG)
pub fn resolve_config_dir(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("ELOG_PATH") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(config_dir) = dirs::config_dir() {
        return Ok(config_dir.join("elog"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".elog"));
    }

    Err(Error::Config(
        "Could not determine config path: no HOME directory or XDG config directory found"
            .to_string(),
    ))
}

/// Expand tilde (~) in paths to the user's home directory
pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub server: String,
    pub port: u16,
    pub database: String,
    pub collection: String,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            server: "localhost".to_string(),
            port: DEFAULT_PORT,
            database: "event_store".to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            timeout_secs: 5,
        }
    }
}

impl StoreConfig {
    pub fn settings(&self) -> StoreSettings {
        let mut settings = StoreSettings::new(&self.server, &self.database);
        settings.port = self.port;
        settings.collection = self.collection.clone();
        settings.timeout = Duration::from_secs(self.timeout_secs);
        settings
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub extension: String,
    pub root_binary: String,
    pub root_type: String,
    pub aggregate_marker: String,
    pub event_marker: String,
    pub projection_marker: String,
    pub skip_prefixes: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        let markers = MarkerNames::default();
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            root_binary: DEFAULT_ROOT_BINARY.to_string(),
            root_type: DEFAULT_ROOT_TYPE.to_string(),
            aggregate_marker: markers.aggregate_root,
            event_marker: markers.event,
            projection_marker: markers.projection,
            skip_prefixes: DEFAULT_SKIP_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// One named environment: where the binaries are and which event store belongs to them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub binaries_path: PathBuf,
    #[serde(default)]
    pub id_matching: IdMatching,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

impl Profile {
    pub fn new(
        binaries_path: impl Into<PathBuf>,
        server: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            binaries_path: binaries_path.into(),
            id_matching: IdMatching::default(),
            store: StoreConfig {
                server: server.into(),
                database: database.into(),
                ..StoreConfig::default()
            },
            discovery: DiscoveryConfig::default(),
        }
    }

    pub fn discovery_options(&self) -> DiscoveryOptions {
        let path = self.binaries_path.to_string_lossy();
        let mut options = DiscoveryOptions::new(expand_tilde(&path));
        options.extension = self.discovery.extension.clone();
        options.root_binary = self.discovery.root_binary.clone();
        options.root_type = self.discovery.root_type.clone();
        options.markers = MarkerNames {
            aggregate_root: self.discovery.aggregate_marker.clone(),
            event: self.discovery.event_marker.clone(),
            projection: self.discovery.projection_marker.clone(),
        };
        options.skip_prefixes = self.discovery.skip_prefixes.clone();
        options
    }

    pub fn store_settings(&self) -> StoreSettings {
        self.store.settings()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub default_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::default_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(resolve_config_dir(None)?.join("config.toml"))
    }

    /// Add or replace a profile. The first profile added becomes the default.
    pub fn set_profile(&mut self, name: impl Into<String>, profile: Profile) {
        let name = name.into();
        if self.default_profile.is_none() {
            self.default_profile = Some(name.clone());
        }
        self.profiles.insert(name, profile);
    }

    /// Look up `name`, or the default profile when no name is given
    pub fn profile(&self, name: Option<&str>) -> Result<&Profile> {
        let name = match name.or(self.default_profile.as_deref()) {
            Some(name) => name,
            None if self.profiles.len() == 1 => {
                return self
                    .profiles
                    .values()
                    .next()
                    .ok_or_else(|| Error::Config("No profiles configured".to_string()));
            }
            None if self.profiles.is_empty() => {
                return Err(Error::Config(
                    "No profiles configured. Run 'elog config init' to create one".to_string(),
                ));
            }
            None => {
                return Err(Error::Config(
                    "Several profiles configured but none is the default".to_string(),
                ));
            }
        };
        self.profiles
            .get(name)
            .ok_or_else(|| Error::ProfileNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.profiles.is_empty());
        assert!(config.default_profile.is_none());
    }

    #[test]
    fn test_config_save_and_load() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.set_profile("local", Profile::new("/srv/app/bin", "localhost", "event_store"));
        config.save_to(&config_path)?;
        assert!(config_path.exists());

        let loaded = Config::load_from(&config_path)?;
        assert_eq!(loaded, config);
        assert_eq!(loaded.default_profile.as_deref(), Some("local"));
        Ok(())
    }

    #[test]
    fn test_load_nonexistent_returns_default() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path)?;
        assert!(config.profiles.is_empty());
        Ok(())
    }

    #[test]
    fn test_partial_profile_gets_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
default_profile = "prod"

[profiles.prod]
binaries_path = "/opt/shop/bin"
id_matching = "contains"

[profiles.prod.store]
server = "mongo.prod"
database = "shop_events"
"#,
        )?;

        let config = Config::load_from(&config_path)?;
        let profile = config.profile(None)?;
        assert_eq!(profile.id_matching, IdMatching::Contains);
        assert_eq!(profile.store.port, 27017);
        assert_eq!(profile.store.collection, "event-log");
        assert_eq!(profile.discovery, DiscoveryConfig::default());

        let settings = profile.store_settings();
        assert_eq!(settings.address(), "mongo.prod:27017");
        assert_eq!(settings.timeout, Duration::from_secs(5));
        Ok(())
    }

    #[test]
    fn test_invalid_toml_is_config_error() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(&config_path, "profiles = 3")?;

        assert!(matches!(Config::load_from(&config_path), Err(Error::Config(_))));
        Ok(())
    }

    #[test]
    fn test_profile_selection() {
        let mut config = Config::default();
        assert!(matches!(config.profile(None), Err(Error::Config(_))));

        config.set_profile("a", Profile::new("/a", "localhost", "a"));
        config.set_profile("b", Profile::new("/b", "localhost", "b"));
        assert_eq!(config.profile(None).map(|p| p.store.database.as_str()).ok(), Some("a"));
        assert_eq!(config.profile(Some("b")).map(|p| p.store.database.as_str()).ok(), Some("b"));
        assert!(matches!(config.profile(Some("c")), Err(Error::ProfileNotFound(_))));

        config.default_profile = None;
        assert!(matches!(config.profile(None), Err(Error::Config(_))));
    }

    #[test]
    fn test_discovery_options_follow_profile() {
        let mut profile = Profile::new("/srv/bin", "localhost", "es");
        profile.discovery.skip_prefixes = vec!["Vendor.".to_string()];
        profile.discovery.event_marker = "DomainEventAttribute".to_string();

        let options = profile.discovery_options();
        assert_eq!(options.binaries_path, PathBuf::from("/srv/bin"));
        assert_eq!(options.skip_prefixes, vec!["Vendor.".to_string()]);
        assert_eq!(options.markers.event, "DomainEventAttribute");
        assert_eq!(options.root_type, "AggregateRoot");
    }

    #[test]
    fn test_explicit_config_dir_wins() -> Result<()> {
        assert_eq!(resolve_config_dir(Some("/etc/elog"))?, PathBuf::from("/etc/elog"));
        Ok(())
    }
}
