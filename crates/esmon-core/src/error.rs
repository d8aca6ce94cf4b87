use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {message}")]
    Read { path: String, message: String },
    #[error("failed to parse configuration file {path}: {message}")]
    Parse { path: String, message: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("failed to find cluster with alias {0} in configuration")]
    UnknownCluster(String),
    #[error("no cluster selected")]
    NoClusterSelected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingCredential {
    Username,
    Password,
    Both,
}

impl MissingCredential {
    pub fn as_str(self) -> &'static str {
        match self {
            MissingCredential::Username => "username",
            MissingCredential::Password => "password",
            MissingCredential::Both => "username and password",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("neither cluster nor default credentials provide a {} for cluster {alias}", missing.as_str())]
pub struct CredentialsError {
    pub alias: String,
    pub missing: MissingCredential,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request to {path} failed: {message}")]
    Network { path: String, message: String },
    #[error("request to {path} timed out after {seconds}s")]
    Timeout { path: String, seconds: u64 },
    #[error("{path} returned HTTP {status}")]
    Status { path: String, status: u16 },
    #[error("failed to decode {path}: {message}")]
    Decode { path: String, message: String },
    #[error("unable to find master node with id {master_id} in node list")]
    MasterNotFound { master_id: String },
    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn network(path: &str, message: impl ToString) -> Self {
        FetchError::Network {
            path: path.to_string(),
            message: message.to_string(),
        }
    }

    pub fn decode(path: &str, message: impl ToString) -> Self {
        FetchError::Decode {
            path: path.to_string(),
            message: message.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }

    /// Transport failures, non-success statuses and timeouts all count as
    /// network errors for display purposes.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            FetchError::Network { .. } | FetchError::Timeout { .. } | FetchError::Status { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}
