//! Catalog connection settings.
//!
//! Settings come from an optional YAML file (explicit path, else
//! `.apicatalog.yaml` in the home directory or the working directory), then
//! command-line/environment overrides. A missing file is fine; a missing URL
//! only matters once an HTTP catalog is actually needed.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const CONFIG_FILE_NAME: &str = ".apicatalog.yaml";

const DEFAULT_DATASPACE: &str = "Tabula";
const DEFAULT_DATASET: &str = "Tabula";
const DEFAULT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Default, Deserialize)]
/// Raw settings as written in the config file.
pub struct CatalogConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub basepath: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub dataspace: Option<String>,
    #[serde(default)]
    pub dataset: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub asset_types: AssetTypeIds,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
/// Catalog asset-type ids used for element and property entities.
pub struct AssetTypeIds {
    #[serde(default = "default_element_type")]
    pub element: String,
    #[serde(default = "default_property_type")]
    pub property: String,
}

impl Default for AssetTypeIds {
    fn default() -> Self {
        Self {
            element: default_element_type(),
            property: default_property_type(),
        }
    }
}

fn default_element_type() -> String {
    "24".to_string()
}

fn default_property_type() -> String {
    "25".to_string()
}

/// Fully resolved settings for the HTTP catalog client.
#[derive(Debug, Clone)]
pub struct CatalogEndpoint {
    pub base_url: String,
    pub dataspace: String,
    pub dataset: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
    pub asset_types: AssetTypeIds,
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl CatalogConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: CatalogConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Load the explicit file when given, else the first discovered one.
    ///
    /// An explicit path must exist; discovery silently falls back to defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let config = Self::load(path)?;
            info!(path = %path.display(), "using config file");
            return Ok(config);
        }
        for candidate in discovery_candidates() {
            if candidate.is_file() {
                let config = Self::load(&candidate)?;
                info!(path = %candidate.display(), "using config file");
                return Ok(config);
            }
        }
        debug!("no config file found; using defaults");
        Ok(Self::default())
    }

    /// Apply command-line/environment values over the file values.
    ///
    /// A URL given as an override is taken verbatim; the file's `basepath` is
    /// only appended to the file's own `url`.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(url) = overrides.url.filter(|v| !v.trim().is_empty()) {
            self.url = Some(url);
            self.basepath = None;
        }
        if let Some(user) = overrides.user.filter(|v| !v.is_empty()) {
            self.user = Some(user);
        }
        if let Some(password) = overrides.password.filter(|v| !v.is_empty()) {
            self.password = Some(password);
        }
        self
    }

    /// Resolve the endpoint for the HTTP catalog client.
    pub fn endpoint(&self) -> Result<CatalogEndpoint> {
        let Some(url) = self.url.as_deref().filter(|v| !v.trim().is_empty()) else {
            bail!(
                "No catalog URL configured. Pass --url, set APICATALOG_URL, or add 'url' to {CONFIG_FILE_NAME}."
            );
        };
        let base_url = format!("{}{}", url, self.basepath.as_deref().unwrap_or_default());
        Ok(CatalogEndpoint {
            base_url,
            dataspace: non_empty_or(&self.dataspace, DEFAULT_DATASPACE),
            dataset: non_empty_or(&self.dataset, DEFAULT_DATASET),
            user: self.user.clone(),
            password: self.password.clone(),
            timeout: Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            asset_types: self.asset_types.clone(),
        })
    }
}

fn non_empty_or(value: &Option<String>, fallback: &str) -> String {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn discovery_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(CONFIG_FILE_NAME));
    }
    candidates.push(PathBuf::from(CONFIG_FILE_NAME));
    candidates
}
