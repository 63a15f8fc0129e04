// datatransfer/src/config/mod.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the location of `config.json`.
pub const CONFIG_PATH_ENV: &str = "DATA_TRANSFER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_SETTINGS_NAMESPACE: &str = "ezsettings";

// Structs for deserializing config.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonRemote {
    pub host: Option<String>,
    pub user: Option<String>,
    pub dir: Option<String>,
    pub env: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonSshProxy {
    pub host: Option<String>,
    pub user: Option<String>,
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonSsh {
    pub options: Option<Vec<String>>,
    pub proxy: Option<JsonSshProxy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonRsync {
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonTransferSection {
    pub remote: Option<JsonRemote>,
    pub console_script: Option<String>,
    pub ssh: Option<JsonSsh>,
    pub rsync: Option<JsonRsync>,
    pub folders: Option<Value>,
    pub siteaccess: Option<String>,
    pub settings_namespace: Option<String>,
}

/// A named database connection as registered in `connections`.
///
/// Either the discrete fields or a `url` may be given; the url wins when both are present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonConnection {
    pub url: Option<String>,
    pub dbname: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawJsonConfig {
    pub cache_dir: Option<PathBuf>,
    pub data_transfer_bundle: Option<JsonTransferSection>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub connections: HashMap<String, JsonConnection>,
}

// Application's internal configuration structs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshProxy {
    pub host: String,
    pub user: String,
    pub options: Vec<String>,
}

/// One remote directory to pull, and where to put it locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderMapping {
    pub source: String,
    pub destination: String,
}

#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub remote_host: String,
    pub remote_user: String,
    pub remote_dir: String,
    pub remote_env: Option<String>,
    pub console_script: String,
    pub ssh_options: Vec<String>,
    pub ssh_proxy: Option<SshProxy>,
    pub rsync_options: Vec<String>,
    pub folders: Vec<FolderMapping>,
    pub siteaccess: String,
    pub settings_namespace: String,
    pub cache_dir: PathBuf,
}

/// Flat, dotted-key parameter store used for database credential lookup.
#[derive(Debug, Clone, Default)]
pub struct ParameterBag {
    values: Map<String, Value>,
}

impl ParameterBag {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub transfer: TransferConfig,
    pub parameters: ParameterBag,
    pub connections: HashMap<String, JsonConnection>,
}

impl AppConfig {
    /// Resolves the config path from `DATA_TRANSFER_CONFIG`, falling back to `config.json`.
    pub fn default_path() -> PathBuf {
        env::var(CONFIG_PATH_ENV)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn load_from_json(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
        let raw_json_config: RawJsonConfig = serde_json::from_str(&config_content)
            .with_context(|| {
                format!(
                    "Failed to parse JSON from config file at {}",
                    config_path.display()
                )
            })?;

        Self::from_raw(raw_json_config)
    }

    pub fn from_raw(raw: RawJsonConfig) -> Result<Self> {
        let section = raw
            .data_transfer_bundle
            .context("data_transfer_bundle must be set in config.json")?;
        let transfer = load_transfer_config(section, raw.cache_dir)?;

        Ok(AppConfig {
            transfer,
            parameters: ParameterBag::new(raw.parameters),
            connections: raw.connections,
        })
    }
}

fn load_transfer_config(
    section: JsonTransferSection,
    cache_dir: Option<PathBuf>,
) -> Result<TransferConfig> {
    let remote = section.remote.unwrap_or_default();
    let remote_host = required(remote.host, "remote.host")?;
    let remote_user = required(remote.user, "remote.user")?;
    let remote_dir = required(remote.dir, "remote.dir")?;
    let console_script = required(section.console_script, "console_script")?;
    let siteaccess = required(section.siteaccess, "siteaccess")?;

    let ssh = section.ssh.unwrap_or_default();
    let ssh_proxy = ssh.proxy.and_then(|proxy| {
        match (
            proxy.host.filter(|s| !s.is_empty()),
            proxy.user.filter(|s| !s.is_empty()),
        ) {
            (Some(host), Some(user)) => Some(SshProxy {
                host,
                user,
                options: proxy.options.unwrap_or_default(),
            }),
            _ => None,
        }
    });

    Ok(TransferConfig {
        remote_host,
        remote_user,
        remote_dir,
        remote_env: remote.env.filter(|s| !s.is_empty()),
        console_script,
        ssh_options: ssh.options.unwrap_or_default(),
        ssh_proxy,
        rsync_options: section.rsync.and_then(|r| r.options).unwrap_or_default(),
        folders: parse_folder_mapping(&section.folders)?,
        siteaccess,
        settings_namespace: section
            .settings_namespace
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SETTINGS_NAMESPACE.to_string()),
        cache_dir: cache_dir.unwrap_or_else(env::temp_dir),
    })
}

fn required(value: Option<String>, key: &str) -> Result<String> {
    value
        .filter(|s| !s.trim().is_empty())
        .with_context(|| format!("data_transfer_bundle.{} must be set in config.json", key))
}

/// Parses the `folders` configuration into ordered source/destination pairs.
///
/// Accepts a plain list of sources (destination inferred as the parent directory)
/// or an object mapping each source to an explicit destination.
fn parse_folder_mapping(folders: &Option<Value>) -> Result<Vec<FolderMapping>> {
    match folders {
        Some(value @ Value::Array(_)) => {
            let sources: Vec<String> = serde_json::from_value(value.clone())
                .context("Failed to parse folders as array of paths")?;
            Ok(sources
                .into_iter()
                .map(|source| FolderMapping {
                    destination: parent_directory(&source),
                    source,
                })
                .collect())
        }
        Some(Value::Object(mapping)) => mapping
            .iter()
            .map(|(source, destination)| {
                let destination = destination.as_str().with_context(|| {
                    format!("Destination for folder '{}' must be a string", source)
                })?;
                Ok(FolderMapping {
                    source: source.clone(),
                    destination: destination.to_string(),
                })
            })
            .collect(),
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(_) => Err(anyhow::anyhow!(
            "folders must be either an array of paths or a mapping object"
        )),
    }
}

fn parent_directory(source: &str) -> String {
    match Path::new(source).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_string_lossy().into_owned(),
        _ => ".".to_string(),
    }
}
