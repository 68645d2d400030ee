//! Cluster topology model: supervisor-issued changes and the derived
//! supervisor-facing snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::revision::Rev;

/// Type of topology change the supervisor is requesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologyChangeType {
    Rebalance,
    Failover,
    /// Anything this build does not understand; admission rejects it.
    #[serde(other)]
    Unknown,
}

impl TopologyChangeType {
    /// The mode string the rebalancer understands, if any.
    pub fn rebalance_mode(&self) -> Option<&'static str> {
        match self {
            Self::Rebalance => Some("rebalance"),
            Self::Failover => Some("failover-hard"),
            Self::Unknown => None,
        }
    }
}

/// A topology change request from the supervisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyChange {
    pub id: String,
    /// Optimistic-concurrency token; absent means "force".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_topology_rev: Option<Rev>,
    #[serde(rename = "type")]
    pub change_type: TopologyChangeType,
    /// Node uuids that remain cluster members after the change.
    pub keep_nodes: Vec<String>,
    /// Node uuids ejected by the change.
    pub eject_nodes: Vec<String>,
}

/// Supervisor-facing topology snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topology {
    pub rev: Rev,
    /// Member node uuids in source order.
    pub nodes: Vec<String>,
    pub is_balanced: bool,
    /// Normalized warning and error lines, warnings sorted first.
    pub messages: Vec<String>,
}

/// Identity of the local node, reported to the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    pub node_uuid: String,
    pub hostname: String,
    pub version: String,
}

/// Member node definition as reported by the topology source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDef {
    pub uuid: String,
    #[serde(default)]
    pub hostname: String,
}

/// Raw topology as reported by the topology source, before derivation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceTopology {
    pub rev: Rev,
    pub member_nodes: Vec<NodeDef>,
    /// Warnings keyed by resource (index) name.
    pub resource_warnings: BTreeMap<String, Vec<String>>,
    /// Errors left behind by the previous rebalance attempt.
    pub prev_errors: Vec<String>,
}
