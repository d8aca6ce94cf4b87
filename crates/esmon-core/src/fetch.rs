//! Fail-fast retrieval of a full [`ClusterSnapshot`].
//!
//! All monitoring calls run concurrently. The first failure ends the fetch,
//! abandons the remaining calls and is returned as-is; a cancelled fetch
//! returns [`FetchError::Cancelled`] and nothing else.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::credentials::Credentials;
use crate::error::FetchError;
use crate::model::{
    CatMasterRow, ClusterInfo, ClusterSnapshot, ClusterStats, IndexStatsResponse, NodesResponse,
    RecoveryResponse, ShardStoresResponse, SnapshotParts,
};

pub const HEALTH_PATH: &str = "/_cluster/health?human";
pub const STATS_PATH: &str = "/_cluster/stats?human";
pub const NODES_PATH: &str = "/_nodes/stats/indices,os,fs?human";
pub const MASTER_PATH: &str = "/_cat/master?format=json";
pub const RECOVERY_PATH: &str = "/_recovery?active_only=true&human";
pub const INDEX_STATS_PATH: &str = "/_stats/docs,store?human&level=indices";
pub const SHARD_STORES_PATH: &str = "/_shard_stores?status=all";

/// Read-only access to a cluster's monitoring endpoints.
pub trait ClusterApi: Send + Sync {
    fn get(&self, path: &'static str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

pub struct HttpClusterApi {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl HttpClusterApi {
    pub fn new(
        endpoint: &str,
        credentials: Credentials,
        insecure: bool,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|err| FetchError::network(endpoint, err))?;
        Ok(Self {
            client,
            base_url: endpoint.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl ClusterApi for HttpClusterApi {
    fn get(&self, path: &'static str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send {
        let request = self.client.get(self.url_for(path)).basic_auth(
            &self.credentials.username,
            Some(&self.credentials.password),
        );
        async move {
            let response = request
                .send()
                .await
                .map_err(|err| FetchError::network(path, err))?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    path: path.to_string(),
                    status: status.as_u16(),
                });
            }
            let body = response
                .bytes()
                .await
                .map_err(|err| FetchError::network(path, err))?;
            Ok(body.to_vec())
        }
    }
}

/// Zero disables the per-request limit.
pub fn request_timeout(seconds: u64) -> Option<Duration> {
    (seconds > 0).then(|| Duration::from_secs(seconds))
}

async fn get_json<A, T>(api: &A, path: &'static str, limit: Option<Duration>) -> Result<T, FetchError>
where
    A: ClusterApi,
    T: DeserializeOwned,
{
    let body = match limit {
        Some(limit) => tokio::time::timeout(limit, api.get(path))
            .await
            .map_err(|_| FetchError::Timeout {
                path: path.to_string(),
                seconds: limit.as_secs(),
            })??,
        None => api.get(path).await?,
    };
    serde_json::from_slice(&body).map_err(|err| FetchError::decode(path, err))
}

async fn get_master_id<A: ClusterApi>(api: &A, limit: Option<Duration>) -> Result<String, FetchError> {
    let rows: Vec<CatMasterRow> = get_json(api, MASTER_PATH, limit).await?;
    rows.into_iter()
        .next()
        .map(|row| row.id)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| FetchError::decode(MASTER_PATH, "no elected master reported"))
}

pub async fn fetch_snapshot<A: ClusterApi>(
    api: &A,
    cancel: &CancellationToken,
    limit: Option<Duration>,
) -> Result<ClusterSnapshot, FetchError> {
    if cancel.is_cancelled() {
        return Err(FetchError::Cancelled);
    }

    let joined = async {
        tokio::try_join!(
            get_json::<_, ClusterInfo>(api, HEALTH_PATH, limit),
            get_json::<_, ClusterStats>(api, STATS_PATH, limit),
            get_json::<_, NodesResponse>(api, NODES_PATH, limit),
            get_master_id(api, limit),
            get_json::<_, RecoveryResponse>(api, RECOVERY_PATH, limit),
            get_json::<_, IndexStatsResponse>(api, INDEX_STATS_PATH, limit),
            get_json::<_, ShardStoresResponse>(api, SHARD_STORES_PATH, limit),
        )
    };

    let (cluster_info, cluster_stats, nodes, master_id, recoveries, indices, shard_stores) = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(FetchError::Cancelled),
        joined = joined => joined?,
    };

    ClusterSnapshot::assemble(SnapshotParts {
        cluster_info,
        cluster_stats,
        nodes,
        master_id,
        recoveries,
        indices,
        shard_stores,
    })
}

pub async fn fetch(
    cancel: &CancellationToken,
    endpoint: &str,
    credentials: Credentials,
    http: HttpConfig,
) -> Result<ClusterSnapshot, FetchError> {
    let api = HttpClusterApi::new(endpoint, credentials, http.insecure)?;
    debug!("fetch_start: {endpoint}");
    let result = fetch_snapshot(&api, cancel, request_timeout(http.timeout)).await;
    match &result {
        Ok(snapshot) => debug!(
            "fetch_done: {endpoint} nodes={} indices={}",
            snapshot.nodes().len(),
            snapshot.indices().len()
        ),
        Err(err) if err.is_cancelled() => debug!("fetch_cancelled: {endpoint}"),
        Err(err) => warn!("fetch_error: {endpoint}: {err}"),
    }
    result
}
