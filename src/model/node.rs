//! Node in the traveler graph.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use super::{NodePayload, UserId};
use crate::Error;

/// Node identifier: `{user_id}_{type}_{8 hex chars}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Draw a fresh id for a node of `node_type` owned by `user`.
    pub fn generate(user: &UserId, node_type: NodeType) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{user}_{node_type}_{}", &suffix[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self { Self(s) }
}

// ============================================================================
// NodeType
// ============================================================================

/// The kind of fact a node records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Budget,
    Interests,
    PreviousTrip,
    Visa,
    TravelPreferences,
}

impl NodeType {
    pub const ALL: [NodeType; 5] = [
        NodeType::Budget,
        NodeType::Interests,
        NodeType::PreviousTrip,
        NodeType::Visa,
        NodeType::TravelPreferences,
    ];

    /// Singleton types hold at most one node per profile and merge on write.
    pub fn is_singleton(self) -> bool {
        matches!(self, NodeType::Budget | NodeType::Interests | NodeType::Visa)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Budget => "budget",
            NodeType::Interests => "interests",
            NodeType::PreviousTrip => "previous_trip",
            NodeType::Visa => "visa",
            NodeType::TravelPreferences => "travel_preferences",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::MalformedInput(format!("unknown node type {s:?}")))
    }
}

// ============================================================================
// Node
// ============================================================================

/// A single typed fact attached to a profile.
///
/// On the wire a node is `{id, type, data, created_at}`; the `type` tag
/// selects which payload shape `data` is decoded into.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawNode")]
pub struct Node {
    pub id: NodeId,
    pub payload: NodePayload,
    pub created_at: DateTime<Utc>,
}

impl Node {
    pub fn new(id: NodeId, payload: NodePayload, created_at: DateTime<Utc>) -> Self {
        Self { id, payload, created_at }
    }

    pub fn node_type(&self) -> NodeType {
        self.payload.node_type()
    }

    pub fn is(&self, node_type: NodeType) -> bool {
        self.node_type() == node_type
    }
}

#[derive(Serialize, Deserialize)]
struct RawNode {
    id: NodeId,
    #[serde(rename = "type")]
    node_type: NodeType,
    data: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<RawNode> for Node {
    type Error = Error;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let payload = NodePayload::from_parts(raw.node_type, raw.data).map_err(|e| {
            Error::MalformedInput(format!("node {}: {e}", raw.id))
        })?;
        Ok(Node { id: raw.id, payload, created_at: raw.created_at })
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let data = self.payload.to_data().map_err(S::Error::custom)?;
        RawNode {
            id: self.id.clone(),
            node_type: self.node_type(),
            data,
            created_at: self.created_at,
        }
        .serialize(serializer)
    }
}
