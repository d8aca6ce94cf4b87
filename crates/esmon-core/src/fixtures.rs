//! Canned monitoring responses shared by the unit tests.

use crate::fetch::{
    HEALTH_PATH, INDEX_STATS_PATH, MASTER_PATH, NODES_PATH, RECOVERY_PATH, SHARD_STORES_PATH,
    STATS_PATH,
};
use crate::model::{CatMasterRow, ClusterSnapshot, SnapshotParts};

pub(crate) fn health(cluster_name: &str) -> String {
    format!(
        r#"{{
            "cluster_name": "{cluster_name}",
            "status": "yellow",
            "timed_out": false,
            "number_of_nodes": 3,
            "number_of_data_nodes": 3,
            "active_primary_shards": 12,
            "active_shards": 20,
            "relocating_shards": 1,
            "initializing_shards": 2,
            "unassigned_shards": 2,
            "delayed_unassigned_shards": 0,
            "number_of_pending_tasks": 0,
            "number_of_in_flight_fetch": 0,
            "task_max_waiting_in_queue_millis": 0,
            "active_shards_percent": "83.3%",
            "active_shards_percent_as_number": 83.33
        }}"#
    )
}

pub(crate) const STATS: &str = r#"{
    "cluster_name": "ignored",
    "indices": {
        "count": 2,
        "store": {
            "size": "10.2gb",
            "size_in_bytes": 10952166604,
            "total_data_set_size": "10.2gb",
            "total_data_set_size_in_bytes": 10952166604,
            "reserved": "0b",
            "reserved_in_bytes": 0
        }
    }
}"#;

pub(crate) const NODES: &str = r#"{
    "_nodes": {"total": 3, "successful": 3, "failed": 0},
    "cluster_name": "ignored",
    "nodes": {
        "n1": {
            "name": "es-c",
            "transport_address": "10.0.0.1:9300",
            "host": "10.0.0.1",
            "ip": "10.0.0.1",
            "roles": ["data", "ingest"],
            "indices": {
                "docs": {"count": 400, "deleted": 1},
                "shard_stats": {"total_count": 6},
                "store": {"size": "3gb", "size_in_bytes": 3221225472}
            },
            "os": {
                "cpu": {"percent": 12, "load_average": {"1m": 0.5, "5m": 0.4, "15m": 0.3}},
                "mem": {"total": "16gb", "used": "12gb", "free": "4gb", "used_percent": 75, "free_percent": 25}
            },
            "fs": {"total": {"total": "100gb", "free": "60gb", "available": "55gb"}}
        },
        "n2": {
            "name": "es-a",
            "transport_address": "10.0.0.2:9300",
            "host": "10.0.0.2",
            "ip": "10.0.0.2",
            "roles": ["data", "master"],
            "indices": {
                "docs": {"count": 500, "deleted": 0},
                "shard_stats": {"total_count": 7},
                "store": {"size": "3.5gb", "size_in_bytes": 3758096384}
            },
            "os": {
                "cpu": {"percent": 40, "load_average": {"1m": 1.5, "5m": 1.2, "15m": 1.0}},
                "mem": {"total": "16gb", "used": "8gb", "free": "8gb", "used_percent": 50, "free_percent": 50}
            },
            "fs": {"total": {"total": "100gb", "free": "40gb", "available": "35gb"}}
        },
        "n3": {
            "name": "es-b",
            "transport_address": "10.0.0.3:9300",
            "host": "10.0.0.3",
            "ip": "10.0.0.3",
            "roles": ["data", "master"],
            "indices": {
                "docs": {"count": 300, "deleted": 2},
                "shard_stats": {"total_count": 7}
            },
            "os": {
                "cpu": {"percent": 5},
                "mem": {"total": "16gb", "used": "4gb", "free": "12gb", "used_percent": 25, "free_percent": 75}
            }
        }
    }
}"#;

pub(crate) const MASTER: &str = r#"[{"id": "n3", "host": "10.0.0.3", "ip": "10.0.0.3", "node": "es-b"}]"#;

pub(crate) const RECOVERY: &str = r#"{
    "logs-2024": {
        "shards": [
            {
                "id": 0,
                "type": "PEER",
                "stage": "INDEX",
                "primary": false,
                "total_time": "5s",
                "total_time_in_millis": 5000,
                "source": {"id": "n2", "host": "10.0.0.2", "transport_address": "10.0.0.2:9300", "ip": "10.0.0.2", "name": "es-a"},
                "target": {"id": "n1", "host": "10.0.0.1", "transport_address": "10.0.0.1:9300", "ip": "10.0.0.1", "name": "es-c"},
                "index": {"size": {"total": "1gb", "total_in_bytes": 1073741824, "recovered": "430mb", "recovered_in_bytes": 450887680, "percent": "42.0%"}}
            },
            {
                "id": 1,
                "type": "SNAPSHOT",
                "stage": "INDEX",
                "primary": true,
                "total_time": "9s",
                "total_time_in_millis": 9000,
                "source": {"repository": "nightly", "snapshot": "snap-1", "version": "8.11.0", "index": "logs-2024"},
                "target": {"id": "n1", "host": "10.0.0.1", "transport_address": "10.0.0.1:9300", "ip": "10.0.0.1", "name": "es-c"}
            }
        ]
    },
    "metrics": {
        "shards": [
            {
                "id": 0,
                "type": "peer",
                "stage": "TRANSLOG",
                "primary": false,
                "total_time": "1.2s",
                "total_time_in_millis": 1200,
                "source": {"id": "n3", "host": "10.0.0.3", "transport_address": "10.0.0.3:9300", "ip": "10.0.0.3", "name": "es-b"},
                "target": {"id": "n2", "host": "10.0.0.2", "transport_address": "10.0.0.2:9300", "ip": "10.0.0.2", "name": "es-a"},
                "index": {"size": {"total": "20mb", "recovered": "20mb", "percent": "100.0%"}}
            },
            {
                "id": 1,
                "type": "PEER",
                "stage": "INDEX",
                "total_time_in_millis": 7000,
                "source": {"repository": "nightly", "snapshot": "snap-2"},
                "target": {"id": "n2", "host": "10.0.0.2", "transport_address": "10.0.0.2:9300", "name": "es-a"}
            }
        ]
    }
}"#;

pub(crate) const INDEX_STATS: &str = r#"{
    "_shards": {"total": 20, "successful": 18, "failed": 0},
    "_all": {},
    "indices": {
        "metrics": {
            "uuid": "m-uuid",
            "health": "green",
            "status": "open",
            "primaries": {"docs": {"count": 80, "deleted": 0}, "store": {"size": "1.5mb", "size_in_bytes": 1572864}},
            "total": {"docs": {"count": 160, "deleted": 0}, "store": {"size": "3.1mb", "size_in_bytes": 3250585}}
        },
        "logs-2024": {
            "uuid": "l-uuid",
            "health": "yellow",
            "status": "open",
            "primaries": {"docs": {"count": 1200, "deleted": 3}, "store": {"size": "1gb", "size_in_bytes": 1073741824}},
            "total": {"docs": {"count": 1200, "deleted": 3}, "store": {"size": "1gb", "size_in_bytes": 1073741824}}
        }
    }
}"#;

pub(crate) const SHARD_STORES: &str = r#"{
    "indices": {
        "metrics": {
            "shards": {
                "0": {"stores": [
                    {"n3": {"name": "es-b", "transport_address": "10.0.0.3:9300", "attributes": {}}, "allocation_id": "m0", "allocation": "primary"}
                ]}
            }
        },
        "logs-2024": {
            "shards": {
                "10": {"stores": [
                    {"n1": {"name": "es-c", "transport_address": "10.0.0.1:9300"}, "allocation": "unused", "store_exception": {"type": "corrupt_index_exception", "reason": "checksum failed"}}
                ]},
                "2": {"stores": [
                    {"n3": {"name": "es-b", "transport_address": "10.0.0.3:9300"}, "allocation_id": "l2", "allocation": "primary"}
                ]},
                "0": {"stores": [
                    {"n2": {"name": "es-a", "transport_address": "10.0.0.2:9300"}, "allocation_id": "l0p", "allocation": "primary"},
                    {"n3": {"name": "es-b", "transport_address": "10.0.0.3:9300"}, "allocation_id": "l0r", "allocation": "replica"}
                ]}
            }
        }
    }
}"#;

/// Response bodies keyed by request path.
pub(crate) fn responses(cluster_name: &str) -> Vec<(&'static str, String)> {
    vec![
        (HEALTH_PATH, health(cluster_name)),
        (STATS_PATH, STATS.to_string()),
        (NODES_PATH, NODES.to_string()),
        (MASTER_PATH, MASTER.to_string()),
        (RECOVERY_PATH, RECOVERY.to_string()),
        (INDEX_STATS_PATH, INDEX_STATS.to_string()),
        (SHARD_STORES_PATH, SHARD_STORES.to_string()),
    ]
}

pub(crate) fn parts(cluster_name: &str) -> SnapshotParts {
    let masters: Vec<CatMasterRow> = serde_json::from_str(MASTER).expect("master fixture");
    SnapshotParts {
        cluster_info: serde_json::from_str(&health(cluster_name)).expect("health fixture"),
        cluster_stats: serde_json::from_str(STATS).expect("stats fixture"),
        nodes: serde_json::from_str(NODES).expect("nodes fixture"),
        master_id: masters[0].id.clone(),
        recoveries: serde_json::from_str(RECOVERY).expect("recovery fixture"),
        indices: serde_json::from_str(INDEX_STATS).expect("index stats fixture"),
        shard_stores: serde_json::from_str(SHARD_STORES).expect("shard stores fixture"),
    }
}

pub(crate) fn snapshot(cluster_name: &str) -> ClusterSnapshot {
    ClusterSnapshot::assemble(parts(cluster_name)).expect("snapshot fixture")
}
