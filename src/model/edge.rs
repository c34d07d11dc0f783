//! Edge (relationship) between two nodes of a profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::NodeId;

/// Relationship used when the caller does not name one.
pub const RELATED: &str = "related";

/// Relationship recorded from a previous trip to the interests it was
/// added under.
pub const INFLUENCED_BY: &str = "influenced_by";

/// A directed edge. Endpoints are not checked against the profile's nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub relationship: String,
    pub created_at: DateTime<Utc>,
}

impl Edge {
    pub fn new(source: NodeId, target: NodeId, relationship: impl Into<String>) -> Self {
        Self {
            source,
            target,
            relationship: relationship.into(),
            created_at: Utc::now(),
        }
    }
}
