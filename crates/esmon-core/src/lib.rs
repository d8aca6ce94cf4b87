//! Cluster health monitoring core: configuration, credential resolution,
//! snapshot fetching and the refresh state machine behind the dashboard.

pub mod config;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod model;
pub mod refresh;
pub mod runtime;

#[cfg(test)]
pub(crate) mod fixtures;

pub use config::{ClusterEndpointConfig, EsmonConfig, HttpConfig, SessionOverrides, SessionSetup};
pub use credentials::Credentials;
pub use error::{ConfigError, CredentialsError, DashboardError, FetchError};
pub use model::ClusterSnapshot;
pub use refresh::{Controller, Generation, Message, Phase, RefreshState};
pub use runtime::{HttpSnapshotSource, RefreshLoop, SnapshotSource};
