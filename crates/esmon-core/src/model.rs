//! Decoded monitoring responses and the assembled [`ClusterSnapshot`].
//!
//! Wire records keep only the fields the dashboard shows. Optional sections
//! default so that version drift in the monitored cluster does not fail a
//! whole fetch; structurally required values (names, ids, recovery types)
//! stay mandatory.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::FetchError;
use crate::fetch::{RECOVERY_PATH, SHARD_STORES_PATH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Green,
    Yellow,
    Red,
    #[default]
    #[serde(other)]
    Unknown,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Green => "green",
            HealthStatus::Yellow => "yellow",
            HealthStatus::Red => "red",
            HealthStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ClusterInfo {
    pub cluster_name: String,
    #[serde(default)]
    pub status: HealthStatus,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub number_of_nodes: u64,
    #[serde(default)]
    pub number_of_data_nodes: u64,
    #[serde(default)]
    pub active_primary_shards: u64,
    #[serde(default)]
    pub active_shards: u64,
    #[serde(default)]
    pub relocating_shards: u64,
    #[serde(default)]
    pub initializing_shards: u64,
    #[serde(default)]
    pub unassigned_shards: u64,
    #[serde(default)]
    pub delayed_unassigned_shards: u64,
    #[serde(default)]
    pub number_of_pending_tasks: u64,
    #[serde(default)]
    pub number_of_in_flight_fetch: u64,
    #[serde(default)]
    pub task_max_waiting_in_queue_millis: u64,
    #[serde(default)]
    pub active_shards_percent: String,
    #[serde(default)]
    pub active_shards_percent_as_number: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreSize {
    pub size: String,
    pub size_in_bytes: u64,
    pub total_data_set_size: String,
    pub total_data_set_size_in_bytes: u64,
    pub reserved: String,
    pub reserved_in_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClusterIndices {
    pub store: StoreSize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClusterStats {
    pub indices: ClusterIndices,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DocCounts {
    pub count: u64,
    pub deleted: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShardCounts {
    pub total_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NodeIndices {
    pub docs: DocCounts,
    pub shard_stats: ShardCounts,
    pub store: StoreSize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoadAverage {
    #[serde(rename = "1m")]
    pub one_minute: f64,
    #[serde(rename = "5m")]
    pub five_minutes: f64,
    #[serde(rename = "15m")]
    pub fifteen_minutes: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NodeCpu {
    pub percent: u64,
    pub load_average: LoadAverage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NodeMemory {
    pub total: String,
    pub total_in_bytes: u64,
    pub used: String,
    pub used_in_bytes: u64,
    pub free: String,
    pub free_in_bytes: u64,
    pub used_percent: u64,
    pub free_percent: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NodeOs {
    pub cpu: NodeCpu,
    pub mem: NodeMemory,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DiskTotals {
    pub total: String,
    pub total_in_bytes: u64,
    pub free: String,
    pub free_in_bytes: u64,
    pub available: String,
    pub available_in_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NodeFs {
    pub total: DiskTotals,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NodeStats {
    /// Key under which the node was returned; filled in when flattening.
    #[serde(skip)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub transport_address: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub indices: NodeIndices,
    #[serde(default)]
    pub os: NodeOs,
    #[serde(default)]
    pub fs: NodeFs,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodesResponse {
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeStats>,
}

impl NodesResponse {
    pub fn into_nodes(self) -> Vec<NodeStats> {
        self.nodes
            .into_iter()
            .map(|(id, mut node)| {
                node.id = id;
                node
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatMasterRow {
    pub id: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub node: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryType {
    Peer,
    Snapshot,
    ExistingStore,
    EmptyStore,
    LocalShards,
    Other,
}

impl RecoveryType {
    pub fn from_wire(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "PEER" => RecoveryType::Peer,
            "SNAPSHOT" => RecoveryType::Snapshot,
            "EXISTING_STORE" => RecoveryType::ExistingStore,
            "EMPTY_STORE" => RecoveryType::EmptyStore,
            "LOCAL_SHARDS" => RecoveryType::LocalShards,
            _ => RecoveryType::Other,
        }
    }
}

impl<'de> Deserialize<'de> for RecoveryType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(RecoveryType::from_wire(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodePeer {
    pub id: String,
    pub host: String,
    pub transport_address: String,
    pub name: String,
    #[serde(default)]
    pub ip: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryPeer {
    pub repository: String,
    pub snapshot: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub index: String,
}

/// Origin or destination of a shard recovery.
///
/// The wire format has no type tag. The node shape is tried first and the
/// repository shape second; a payload matching neither is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryPeer {
    Node(NodePeer),
    Repository(RepositoryPeer),
}

impl RecoveryPeer {
    pub fn from_value(value: &Value) -> Result<Self, String> {
        if let Ok(node) = NodePeer::deserialize(value) {
            return Ok(RecoveryPeer::Node(node));
        }
        RepositoryPeer::deserialize(value)
            .map(RecoveryPeer::Repository)
            .map_err(|_| format!("recovery peer matches neither node nor repository shape: {value}"))
    }

    pub fn is_node(&self) -> bool {
        matches!(self, RecoveryPeer::Node(_))
    }

    pub fn display_name(&self) -> String {
        match self {
            RecoveryPeer::Node(node) => node.name.clone(),
            RecoveryPeer::Repository(repo) => format!("{}/{}", repo.repository, repo.snapshot),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecoverySize {
    pub total: String,
    pub total_in_bytes: u64,
    pub recovered: String,
    pub recovered_in_bytes: u64,
    pub percent: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecoveryIndex {
    pub size: RecoverySize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawShardRecovery {
    pub id: u32,
    #[serde(rename = "type")]
    pub recovery_type: RecoveryType,
    #[serde(default)]
    pub stage: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub total_time: String,
    #[serde(default)]
    pub total_time_in_millis: u64,
    #[serde(default)]
    pub source: Value,
    #[serde(default)]
    pub target: Value,
    #[serde(default)]
    pub index: RecoveryIndex,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawIndexRecovery {
    #[serde(default)]
    pub shards: Vec<RawShardRecovery>,
}

pub type RecoveryResponse = BTreeMap<String, RawIndexRecovery>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovery {
    pub index_name: String,
    pub shard_id: u32,
    pub recovery_type: RecoveryType,
    pub stage: String,
    pub primary: bool,
    pub total_time: String,
    pub total_time_in_millis: u64,
    pub source: RecoveryPeer,
    pub target: RecoveryPeer,
    pub size: RecoverySize,
}

/// Keeps node-to-node recoveries only, annotated with their index and
/// ordered longest-running first.
pub fn flatten_recoveries(response: RecoveryResponse) -> Result<Vec<Recovery>, FetchError> {
    let mut recoveries = Vec::new();
    for (index_name, index) in response {
        for shard in index.shards {
            if shard.recovery_type != RecoveryType::Peer {
                continue;
            }
            let source = RecoveryPeer::from_value(&shard.source)
                .map_err(|message| FetchError::decode(RECOVERY_PATH, message))?;
            if !source.is_node() {
                continue;
            }
            let target = RecoveryPeer::from_value(&shard.target)
                .map_err(|message| FetchError::decode(RECOVERY_PATH, message))?;
            recoveries.push(Recovery {
                index_name: index_name.clone(),
                shard_id: shard.id,
                recovery_type: shard.recovery_type,
                stage: shard.stage,
                primary: shard.primary,
                total_time: shard.total_time,
                total_time_in_millis: shard.total_time_in_millis,
                source,
                target,
                size: shard.index.size,
            });
        }
    }
    recoveries.sort_by(|a, b| b.total_time_in_millis.cmp(&a.total_time_in_millis));
    Ok(recoveries)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IndexTotals {
    pub docs: DocCounts,
    pub store: StoreSize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IndexStats {
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub health: HealthStatus,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub primaries: IndexTotals,
    #[serde(default)]
    pub total: IndexTotals,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexStatsResponse {
    #[serde(default)]
    pub indices: BTreeMap<String, IndexStats>,
}

impl IndexStatsResponse {
    pub fn into_indices(self) -> Vec<IndexStats> {
        self.indices
            .into_iter()
            .map(|(name, mut stats)| {
                stats.name = name;
                stats
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShardAllocation {
    Primary,
    Replica,
    Unused,
    Other(String),
}

impl ShardAllocation {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "primary" => ShardAllocation::Primary,
            "replica" => ShardAllocation::Replica,
            "unused" => ShardAllocation::Unused,
            other => ShardAllocation::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardStore {
    pub node_id: String,
    pub node_name: String,
    pub transport_address: String,
    pub allocation: ShardAllocation,
    pub allocation_id: Option<String>,
    pub store_exception: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardStores {
    pub index: String,
    pub shard: u32,
    pub stores: Vec<ShardStore>,
}

impl ShardStores {
    pub fn node_names(&self, allocation: &ShardAllocation) -> Vec<&str> {
        self.stores
            .iter()
            .filter(|store| &store.allocation == allocation)
            .map(|store| store.node_name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawShardStoreList {
    #[serde(default)]
    pub stores: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawIndexShardStores {
    #[serde(default)]
    pub shards: BTreeMap<String, RawShardStoreList>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShardStoresResponse {
    #[serde(default)]
    pub indices: BTreeMap<String, RawIndexShardStores>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct StoreNode {
    name: String,
    #[serde(default)]
    transport_address: String,
}

impl ShardStoresResponse {
    pub fn into_shard_stores(self) -> Result<Vec<ShardStores>, FetchError> {
        let mut shard_stores = Vec::new();
        for (index, raw_index) in self.indices {
            for (shard_key, list) in raw_index.shards {
                let shard = shard_key.parse::<u32>().map_err(|_| {
                    FetchError::decode(
                        SHARD_STORES_PATH,
                        format!("shard key {shard_key:?} of index {index} is not a number"),
                    )
                })?;
                let stores = list
                    .stores
                    .into_iter()
                    .map(decode_store_entry)
                    .collect::<Result<Vec<_>, _>>()?;
                shard_stores.push(ShardStores {
                    index: index.clone(),
                    shard,
                    stores,
                });
            }
        }
        shard_stores.sort_by(|a, b| a.index.cmp(&b.index).then(a.shard.cmp(&b.shard)));
        Ok(shard_stores)
    }
}

// Each entry keys its node by id next to the allocation fields; the node is
// the only object-valued key that is not a known field.
fn decode_store_entry(entry: Map<String, Value>) -> Result<ShardStore, FetchError> {
    let mut allocation = ShardAllocation::Other(String::new());
    let mut allocation_id = None;
    let mut store_exception = None;
    let mut node = None;

    for (key, value) in entry {
        match key.as_str() {
            "allocation" => {
                allocation = ShardAllocation::from_wire(value.as_str().unwrap_or_default());
            }
            "allocation_id" => {
                allocation_id = value.as_str().map(str::to_string);
            }
            "store_exception" => {
                store_exception = Some(
                    value
                        .get("reason")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| value.to_string()),
                );
            }
            _ if value.is_object() && node.is_none() => node = Some((key, value)),
            _ => {}
        }
    }

    let (node_id, node_value) = node.ok_or_else(|| {
        FetchError::decode(SHARD_STORES_PATH, "shard store entry without a node")
    })?;
    let store_node: StoreNode = serde_json::from_value(node_value)
        .map_err(|err| FetchError::decode(SHARD_STORES_PATH, err))?;

    Ok(ShardStore {
        node_id,
        node_name: store_node.name,
        transport_address: store_node.transport_address,
        allocation,
        allocation_id,
        store_exception,
    })
}

/// Raw results of every sub-call of one fetch, before assembly.
#[derive(Debug, Clone)]
pub struct SnapshotParts {
    pub cluster_info: ClusterInfo,
    pub cluster_stats: ClusterStats,
    pub nodes: NodesResponse,
    pub master_id: String,
    pub recoveries: RecoveryResponse,
    pub indices: IndexStatsResponse,
    pub shard_stores: ShardStoresResponse,
}

/// One internally consistent read of a cluster. Never mutated once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSnapshot {
    cluster_info: ClusterInfo,
    cluster_stats: ClusterStats,
    nodes: Vec<NodeStats>,
    master: usize,
    recoveries: Vec<Recovery>,
    indices: Vec<IndexStats>,
    shard_stores: Vec<ShardStores>,
}

impl ClusterSnapshot {
    pub fn assemble(parts: SnapshotParts) -> Result<Self, FetchError> {
        let mut nodes = parts.nodes.into_nodes();
        nodes.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        let master = nodes
            .iter()
            .position(|node| node.id == parts.master_id)
            .ok_or_else(|| FetchError::MasterNotFound {
                master_id: parts.master_id.clone(),
            })?;

        let recoveries = flatten_recoveries(parts.recoveries)?;
        let indices = parts.indices.into_indices();
        let shard_stores = parts.shard_stores.into_shard_stores()?;

        Ok(Self {
            cluster_info: parts.cluster_info,
            cluster_stats: parts.cluster_stats,
            nodes,
            master,
            recoveries,
            indices,
            shard_stores,
        })
    }

    pub fn cluster_info(&self) -> &ClusterInfo {
        &self.cluster_info
    }

    pub fn cluster_stats(&self) -> &ClusterStats {
        &self.cluster_stats
    }

    pub fn nodes(&self) -> &[NodeStats] {
        &self.nodes
    }

    pub fn master_node(&self) -> &NodeStats {
        &self.nodes[self.master]
    }

    pub fn is_master(&self, node: &NodeStats) -> bool {
        std::ptr::eq(node, self.master_node())
    }

    pub fn recoveries(&self) -> &[Recovery] {
        &self.recoveries
    }

    pub fn indices(&self) -> &[IndexStats] {
        &self.indices
    }

    pub fn shard_stores(&self) -> &[ShardStores] {
        &self.shard_stores
    }
}
