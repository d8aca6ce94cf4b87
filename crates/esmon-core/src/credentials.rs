use std::fmt;

use crate::config::ClusterEndpointConfig;
use crate::error::{CredentialsError, MissingCredential};

pub const REDACTED_PASSWORD: &str = "*****";

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &REDACTED_PASSWORD)
            .finish()
    }
}

/// Cluster-specific username/password win over the session defaults field
/// by field; empty values never override.
pub fn resolve(
    cluster: &ClusterEndpointConfig,
    defaults: &Credentials,
) -> Result<Credentials, CredentialsError> {
    let username = pick(cluster.username.as_deref(), &defaults.username);
    let password = pick(cluster.password.as_deref(), &defaults.password);

    let missing = match (username.is_empty(), password.is_empty()) {
        (false, false) => return Ok(Credentials { username, password }),
        (true, false) => MissingCredential::Username,
        (false, true) => MissingCredential::Password,
        (true, true) => MissingCredential::Both,
    };
    Err(CredentialsError {
        alias: cluster.alias.clone(),
        missing,
    })
}

fn pick(cluster_value: Option<&str>, default_value: &str) -> String {
    match cluster_value {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => default_value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(username: Option<&str>, password: Option<&str>) -> ClusterEndpointConfig {
        ClusterEndpointConfig {
            alias: "prod".to_string(),
            endpoint: "https://prod.example:9200".to_string(),
            username: username.map(str::to_string),
            password: password.map(str::to_string),
        }
    }

    #[test]
    fn cluster_values_override_defaults_per_field() {
        let defaults = Credentials::new("admin", "secret");
        let resolved = resolve(&cluster(Some("reader"), None), &defaults).expect("resolve");
        assert_eq!(resolved, Credentials::new("reader", "secret"));

        let resolved = resolve(&cluster(None, Some("other")), &defaults).expect("resolve");
        assert_eq!(resolved, Credentials::new("admin", "other"));
    }

    #[test]
    fn empty_cluster_values_fall_back_to_defaults() {
        let defaults = Credentials::new("admin", "secret");
        let resolved = resolve(&cluster(Some(""), Some("")), &defaults).expect("resolve");
        assert_eq!(resolved, defaults);
    }

    #[test]
    fn incomplete_credentials_are_rejected() {
        let err = resolve(&cluster(Some("reader"), None), &Credentials::default())
            .expect_err("password missing");
        assert_eq!(err.alias, "prod");
        assert_eq!(err.missing, MissingCredential::Password);

        let err = resolve(&cluster(None, None), &Credentials::default()).expect_err("missing");
        assert_eq!(err.missing, MissingCredential::Both);
    }

    #[test]
    fn debug_output_redacts_password() {
        let rendered = format!("{:?}", Credentials::new("admin", "hunter2"));
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains(REDACTED_PASSWORD));
    }
}
