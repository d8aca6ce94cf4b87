use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;
use url::Url;

use crate::credentials::Credentials;
use crate::error::ConfigError;

pub const PROGRAM_NAME: &str = "esmon";
pub const CONFIG_FILE_NAME: &str = "esmon.toml";
pub const ENV_PREFIX: &str = "ESMON";
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClusterEndpointConfig {
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout: u64,
    pub insecure: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_HTTP_TIMEOUT_SECS,
            insecure: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub refresh_interval: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EsmonConfig {
    pub clusters: Vec<ClusterEndpointConfig>,
    pub http: HttpConfig,
    pub general: GeneralConfig,
}

/// Values supplied on the command line. They take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOverrides {
    pub cluster: Option<String>,
    pub endpoint: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub insecure: Option<bool>,
}

/// Everything the refresh controller needs to run a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSetup {
    pub clusters: Vec<ClusterEndpointConfig>,
    pub selected: Option<String>,
    pub default_credentials: Credentials,
    pub http: HttpConfig,
    pub refresh_interval_secs: u64,
}

impl EsmonConfig {
    pub fn from_toml_str(contents: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|err| ConfigError::Parse {
            path: origin.to_string(),
            message: err.to_string(),
        })
    }

    /// Reads the explicit path when given, otherwise the first existing
    /// candidate; a missing file yields defaults. Environment overrides are
    /// applied and clusters are sorted by alias.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => candidate_paths().into_iter().find(|path| path.is_file()),
        };
        let mut config = match path {
            Some(path) => {
                let contents = fs::read_to_string(&path).map_err(|err| ConfigError::Read {
                    path: path.display().to_string(),
                    message: err.to_string(),
                })?;
                debug!("config_loaded: {}", path.display());
                Self::from_toml_str(&contents, &path.display().to_string())?
            }
            None => {
                debug!("config_missing: using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.sort_clusters();
        Ok(config)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = env_key("http.timeout");
        if let Some(value) = lookup(&key) {
            self.http.timeout = parse_env_u64(&key, &value)?;
        }
        let key = env_key("http.insecure");
        if let Some(value) = lookup(&key) {
            self.http.insecure = parse_bool_flag(&value).ok_or_else(|| {
                ConfigError::Invalid(format!("{key} must be a boolean, got {value:?}"))
            })?;
        }
        let key = env_key("general.refresh_interval");
        if let Some(value) = lookup(&key) {
            self.general.refresh_interval = parse_env_u64(&key, &value)?;
        }
        Ok(())
    }

    pub fn sort_clusters(&mut self) {
        self.clusters.sort_by(|a, b| a.alias.cmp(&b.alias));
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut aliases = HashSet::new();
        let mut endpoints = HashSet::new();
        for (index, cluster) in self.clusters.iter().enumerate() {
            if cluster.alias.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "clusters[{index}]: alias is required"
                )));
            }
            if cluster.endpoint.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "cluster {}: endpoint is required",
                    cluster.alias
                )));
            }
            if !is_http_url(&cluster.endpoint) {
                return Err(ConfigError::Invalid(format!(
                    "cluster {}: endpoint {} is not an http(s) URL",
                    cluster.alias, cluster.endpoint
                )));
            }
            if !aliases.insert(cluster.alias.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate cluster alias {}",
                    cluster.alias
                )));
            }
            if !endpoints.insert(cluster.endpoint.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate cluster endpoint {}",
                    cluster.endpoint
                )));
            }
        }
        Ok(())
    }

    /// An explicit endpoint replaces the configured cluster list with a single
    /// ad-hoc entry; otherwise the named alias must exist. Without either no
    /// cluster is selected and the dashboard opens on cluster selection.
    pub fn into_session(self, overrides: &SessionOverrides) -> Result<SessionSetup, ConfigError> {
        overrides.validate()?;
        self.validate()?;

        let mut clusters = self.clusters;
        let mut selected = None;
        if let Some(endpoint) = non_empty(overrides.endpoint.as_deref()) {
            clusters = vec![ClusterEndpointConfig {
                alias: endpoint.to_string(),
                endpoint: endpoint.to_string(),
                username: overrides.username.clone(),
                password: overrides.password.clone(),
            }];
            selected = Some(endpoint.to_string());
        } else if let Some(alias) = non_empty(overrides.cluster.as_deref()) {
            if !clusters.iter().any(|cluster| cluster.alias == alias) {
                return Err(ConfigError::UnknownCluster(alias.to_string()));
            }
            selected = Some(alias.to_string());
        }

        Ok(SessionSetup {
            clusters,
            selected,
            default_credentials: Credentials {
                username: overrides.username.clone().unwrap_or_default(),
                password: overrides.password.clone().unwrap_or_default(),
            },
            http: HttpConfig {
                timeout: self.http.timeout,
                insecure: overrides.insecure.unwrap_or(self.http.insecure),
            },
            refresh_interval_secs: self.general.refresh_interval,
        })
    }
}

impl SessionOverrides {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let username = non_empty(self.username.as_deref());
        let password = non_empty(self.password.as_deref());
        if let Some(endpoint) = non_empty(self.endpoint.as_deref()) {
            if !is_http_url(endpoint) {
                return Err(ConfigError::InvalidArguments(
                    "endpoint must be an URL".to_string(),
                ));
            }
            if username.is_none() || password.is_none() {
                return Err(ConfigError::InvalidArguments(
                    "credentials (username, password) must be used when specifying endpoint"
                        .to_string(),
                ));
            }
        }
        if username.is_some() && password.is_none() {
            return Err(ConfigError::InvalidArguments(
                "password must be used when specifying username".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(PROGRAM_NAME).join(CONFIG_FILE_NAME));
    }
    if let Some(home) = dirs::home_dir() {
        let path = home.join(".config").join(PROGRAM_NAME).join(CONFIG_FILE_NAME);
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    paths
}

fn env_key(key: &str) -> String {
    format!("{ENV_PREFIX}_{}", key.replace('.', "_").to_ascii_uppercase())
}

fn parse_env_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| {
        ConfigError::Invalid(format!("{key} must be a non-negative integer, got {value:?}"))
    })
}

fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn is_http_url(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const SAMPLE: &str = r#"
[[clusters]]
alias = "stage"
endpoint = "https://stage.example:9200"

[[clusters]]
alias = "prod"
endpoint = "https://prod.example:9200"
username = "reader"
password = "secret"

[http]
insecure = true
"#;

    #[test]
    fn parses_clusters_and_fills_defaults() {
        let config = EsmonConfig::from_toml_str(SAMPLE, "inline").expect("parse");
        assert_eq!(config.clusters.len(), 2);
        assert_eq!(config.clusters[1].username.as_deref(), Some("reader"));
        assert!(config.http.insecure);
        assert_eq!(config.http.timeout, DEFAULT_HTTP_TIMEOUT_SECS);
        assert_eq!(
            config.general.refresh_interval,
            DEFAULT_REFRESH_INTERVAL_SECS
        );
    }

    #[test]
    fn load_reads_explicit_file_and_sorts_by_alias() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(SAMPLE.as_bytes()).expect("write");
        let config = EsmonConfig::load(Some(file.path())).expect("load");
        let aliases: Vec<_> = config.clusters.iter().map(|c| c.alias.as_str()).collect();
        assert_eq!(aliases, vec!["prod", "stage"]);
    }

    #[test]
    fn load_fails_for_missing_explicit_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = EsmonConfig::load(Some(&dir.path().join("absent.toml"))).expect_err("missing");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = EsmonConfig::from_toml_str("[[clusters]\nalias=", "inline").expect_err("bad");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("ESMON_HTTP_TIMEOUT", "15"),
            ("ESMON_HTTP_INSECURE", "yes"),
            ("ESMON_GENERAL_REFRESH_INTERVAL", "0"),
        ]);
        let mut config = EsmonConfig::default();
        config
            .apply_env_overrides(|key| env.get(key).map(|value| value.to_string()))
            .expect("overrides");
        assert_eq!(config.http.timeout, 15);
        assert!(config.http.insecure);
        assert_eq!(config.general.refresh_interval, 0);

        let err = config
            .apply_env_overrides(|key| (key == "ESMON_HTTP_TIMEOUT").then(|| "soon".to_string()))
            .expect_err("invalid");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn validation_rejects_duplicates_and_bad_endpoints() {
        let mut config = EsmonConfig::from_toml_str(SAMPLE, "inline").expect("parse");
        assert!(config.validate().is_ok());

        config.clusters[1].alias = "stage".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.clusters[1].alias = "prod".to_string();
        config.clusters[1].endpoint = "prod.example:9200".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.clusters[1].endpoint = "https://stage.example:9200".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn endpoint_override_replaces_cluster_list() {
        let config = EsmonConfig::from_toml_str(SAMPLE, "inline").expect("parse");
        let overrides = SessionOverrides {
            endpoint: Some("http://localhost:9200".to_string()),
            username: Some("elastic".to_string()),
            password: Some("changeme".to_string()),
            insecure: Some(false),
            ..SessionOverrides::default()
        };
        let session = config.into_session(&overrides).expect("session");
        assert_eq!(session.clusters.len(), 1);
        assert_eq!(session.clusters[0].endpoint, "http://localhost:9200");
        assert_eq!(session.selected.as_deref(), Some("http://localhost:9200"));
        assert!(!session.http.insecure);
        assert_eq!(session.default_credentials.username, "elastic");
    }

    #[test]
    fn cluster_override_must_name_a_configured_alias() {
        let config = EsmonConfig::from_toml_str(SAMPLE, "inline").expect("parse");
        let overrides = SessionOverrides {
            cluster: Some("prod".to_string()),
            ..SessionOverrides::default()
        };
        let session = config.clone().into_session(&overrides).expect("session");
        assert_eq!(session.selected.as_deref(), Some("prod"));
        assert!(session.http.insecure);

        let overrides = SessionOverrides {
            cluster: Some("qa".to_string()),
            ..SessionOverrides::default()
        };
        assert_eq!(
            config.into_session(&overrides),
            Err(ConfigError::UnknownCluster("qa".to_string()))
        );
    }

    #[test]
    fn no_selection_is_not_an_error_at_setup_time() {
        let config = EsmonConfig::from_toml_str(SAMPLE, "inline").expect("parse");
        let session = config
            .into_session(&SessionOverrides::default())
            .expect("session");
        assert!(session.selected.is_none());
        assert_eq!(session.refresh_interval_secs, DEFAULT_REFRESH_INTERVAL_SECS);
    }

    #[test]
    fn argument_rules_match_endpoint_and_credentials() {
        let endpoint_without_credentials = SessionOverrides {
            endpoint: Some("http://localhost:9200".to_string()),
            ..SessionOverrides::default()
        };
        assert!(matches!(
            endpoint_without_credentials.validate(),
            Err(ConfigError::InvalidArguments(_))
        ));

        let username_without_password = SessionOverrides {
            username: Some("elastic".to_string()),
            ..SessionOverrides::default()
        };
        assert!(username_without_password.validate().is_err());

        let not_a_url = SessionOverrides {
            endpoint: Some("localhost".to_string()),
            username: Some("elastic".to_string()),
            password: Some("changeme".to_string()),
            ..SessionOverrides::default()
        };
        assert!(not_a_url.validate().is_err());
    }
}
