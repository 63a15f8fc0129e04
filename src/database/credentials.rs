// datatransfer/src/database/credentials.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;
use url::Url;

use crate::config::{AppConfig, JsonConnection, ParameterBag};
use crate::errors::FetchError;

/// Parameter holding the repository registry (`name -> { connection: ... }`).
pub const REPOSITORIES_PARAMETER: &str = "ezpublish.repositories";

/// Local database connection parameters used for the import.
#[derive(Clone, PartialEq, Eq)]
pub struct DbCredentials {
    pub database: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: Option<u16>,
}

impl fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbCredentials")
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"****")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

/// Everything a strategy may look at while resolving credentials.
pub struct CredentialContext<'a> {
    pub parameters: &'a ParameterBag,
    pub connections: &'a HashMap<String, JsonConnection>,
    pub namespace: &'a str,
    pub siteaccess: &'a str,
}

impl<'a> CredentialContext<'a> {
    pub fn from_config(app_config: &'a AppConfig) -> Self {
        Self {
            parameters: &app_config.parameters,
            connections: &app_config.connections,
            namespace: &app_config.transfer.settings_namespace,
            siteaccess: &app_config.transfer.siteaccess,
        }
    }

    fn siteaccess_key(&self, suffix: &str) -> String {
        format!("{}.{}.{}", self.namespace, self.siteaccess, suffix)
    }
}

/// One configuration shape that may hold the siteaccess' database settings.
///
/// `resolve` returns `Ok(None)` when the shape is simply absent, and an error
/// when it is present but broken.
pub trait CredentialStrategy {
    fn parameter_key(&self, ctx: &CredentialContext<'_>) -> String;
    fn resolve(&self, ctx: &CredentialContext<'_>) -> Result<Option<DbCredentials>>;
}

/// `<namespace>.<siteaccess>.database.params` holding the connection fields directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyParameters;

#[derive(Debug, Deserialize)]
struct LegacyParams {
    database: String,
    user: Option<String>,
    password: Option<String>,
    host: Option<String>,
    port: Option<u16>,
}

impl CredentialStrategy for LegacyParameters {
    fn parameter_key(&self, ctx: &CredentialContext<'_>) -> String {
        ctx.siteaccess_key("database.params")
    }

    fn resolve(&self, ctx: &CredentialContext<'_>) -> Result<Option<DbCredentials>> {
        let key = self.parameter_key(ctx);
        let Some(value) = ctx.parameters.get(&key) else {
            return Ok(None);
        };
        let params: LegacyParams = serde_json::from_value(value.clone())
            .with_context(|| format!("Failed to parse database settings from {}", key))?;

        Ok(Some(DbCredentials {
            database: params.database,
            user: params.user.unwrap_or_default(),
            password: params.password.unwrap_or_default(),
            host: params.host.unwrap_or_default(),
            port: params.port,
        }))
    }
}

/// `<namespace>.<siteaccess>.repository` naming a repository, whose
/// connection is looked up in the connection registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct RepositoryConnection;

impl CredentialStrategy for RepositoryConnection {
    fn parameter_key(&self, ctx: &CredentialContext<'_>) -> String {
        ctx.siteaccess_key("repository")
    }

    fn resolve(&self, ctx: &CredentialContext<'_>) -> Result<Option<DbCredentials>> {
        let key = self.parameter_key(ctx);
        let Some(value) = ctx.parameters.get(&key) else {
            return Ok(None);
        };
        let repository = value
            .as_str()
            .with_context(|| format!("{} must be a repository name", key))?;

        let connection_name = ctx
            .parameters
            .get(REPOSITORIES_PARAMETER)
            .and_then(|repositories| repositories.get(repository))
            .and_then(|entry| entry.get("connection"))
            .and_then(|connection| connection.as_str())
            .with_context(|| {
                format!(
                    "Repository '{}' (from {}) has no connection defined in {}",
                    repository, key, REPOSITORIES_PARAMETER
                )
            })?;

        let connection = ctx.connections.get(connection_name).with_context(|| {
            format!(
                "Connection '{}' used by repository '{}' is not defined in connections",
                connection_name, repository
            )
        })?;

        connection_credentials(connection)
            .with_context(|| format!("Invalid connection '{}'", connection_name))
            .map(Some)
    }
}

/// Converts a registered connection, given either as a url or as discrete fields.
fn connection_credentials(connection: &JsonConnection) -> Result<DbCredentials> {
    if let Some(raw_url) = connection.url.as_deref().filter(|s| !s.is_empty()) {
        let parsed = Url::parse(raw_url).context("Invalid database URL format")?;
        let database = parsed.path().trim_start_matches('/');
        if database.is_empty() {
            anyhow::bail!("Database name not found in URL path");
        }
        return Ok(DbCredentials {
            database: database.to_string(),
            user: parsed.username().to_string(),
            password: parsed.password().unwrap_or_default().to_string(),
            host: parsed.host_str().unwrap_or_default().to_string(),
            port: parsed.port(),
        });
    }

    Ok(DbCredentials {
        database: connection
            .dbname
            .clone()
            .filter(|s| !s.is_empty())
            .context("dbname must be set when no url is given")?,
        user: connection.user.clone().unwrap_or_default(),
        password: connection.password.clone().unwrap_or_default(),
        host: connection.host.clone().unwrap_or_default(),
        port: None,
    })
}

/// Legacy flat parameters first, then the repository indirection.
pub fn default_strategies() -> Vec<Box<dyn CredentialStrategy>> {
    vec![Box::new(LegacyParameters), Box::new(RepositoryConnection)]
}

/// Tries each strategy in order and returns the first credentials found.
pub fn resolve_credentials(
    ctx: &CredentialContext<'_>,
    strategies: &[Box<dyn CredentialStrategy>],
) -> Result<DbCredentials> {
    for strategy in strategies {
        if let Some(credentials) = strategy.resolve(ctx)? {
            debug!(
                key = %strategy.parameter_key(ctx),
                ?credentials,
                "resolved database credentials"
            );
            return Ok(credentials);
        }
    }

    Err(FetchError::CredentialResolution {
        keys: strategies.iter().map(|s| s.parameter_key(ctx)).collect(),
    }
    .into())
}
