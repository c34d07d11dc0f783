//! Profile: one traveler's nodes, edges and timestamps.
//!
//! All merge and bookkeeping rules live here as plain `&mut self` methods.
//! Locking is the store's business; a `Profile` is just data.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use super::{Edge, Node, NodeId, NodePayload, NodeType, INFLUENCED_BY};
use crate::{Error, Result};

// ============================================================================
// UserId
// ============================================================================

/// Owner of a profile. Never empty or whitespace-only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidUserId(id));
        }
        Ok(Self(id))
    }

    /// A random (v4 UUID) id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for UserId {
    type Target = str;
    fn deref(&self) -> &str { &self.0 }
}

impl Borrow<str> for UserId {
    fn borrow(&self) -> &str { &self.0 }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str { &self.0 }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = Error;
    fn try_from(s: String) -> Result<Self> { UserId::new(s) }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self { id.0 }
}

impl FromStr for UserId {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> { UserId::new(s) }
}

// ============================================================================
// NodeMap
// ============================================================================

/// Nodes keyed by id, iterated in insertion order.
///
/// Serialized as a JSON object `{node_id: node}` whose key order is the
/// insertion order, so "first node of a type" and "creation order" survive
/// a save/load cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMap {
    nodes: Vec<Node>,
}

impl NodeMap {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.nodes.len() }

    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.iter().any(|n| n.id == *id)
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == *id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.iter().map(|n| &n.id)
    }

    /// Nodes of one type, in insertion order.
    pub fn of_type(&self, node_type: NodeType) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.is(node_type))
    }

    pub fn first_of_type(&self, node_type: NodeType) -> Option<&Node> {
        self.of_type(node_type).next()
    }

    fn first_of_type_mut(&mut self, node_type: NodeType) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.is(node_type))
    }

    /// Callers guarantee `node.id` is not already present.
    fn push(&mut self, node: Node) {
        debug_assert!(!self.contains(&node.id));
        self.nodes.push(node);
    }
}

impl<'a> IntoIterator for &'a NodeMap {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;
    fn into_iter(self) -> Self::IntoIter { self.nodes.iter() }
}

impl Serialize for NodeMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.nodes.len()))?;
        for node in &self.nodes {
            map.serialize_entry(&node.id, node)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for NodeMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct NodeMapVisitor;

        impl<'de> Visitor<'de> for NodeMapVisitor {
            type Value = NodeMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of node id to node")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<NodeMap, A::Error> {
                use serde::de::Error as _;

                let mut out = NodeMap::new();
                while let Some((key, node)) = access.next_entry::<NodeId, Node>()? {
                    if key != node.id {
                        return Err(A::Error::custom(format!(
                            "node keyed {key} carries id {}", node.id
                        )));
                    }
                    if out.contains(&key) {
                        return Err(A::Error::custom(format!("duplicate node id {key}")));
                    }
                    out.nodes.push(node);
                }
                Ok(out)
            }
        }

        deserializer.deserialize_map(NodeMapVisitor)
    }
}

// ============================================================================
// Profile
// ============================================================================

/// A traveler's fact graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub nodes: NodeMap,
    pub edges: Vec<Edge>,
}

impl Profile {
    /// An empty profile.
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            created_at: now,
            last_updated: now,
            nodes: NodeMap::new(),
            edges: Vec::new(),
        }
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }

    pub fn edge_count(&self) -> usize { self.edges.len() }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// First node of `node_type` in insertion order.
    pub fn find_node_by_type(&self, node_type: NodeType) -> Option<&Node> {
        self.nodes.first_of_type(node_type)
    }

    pub fn nodes_of_type(&self, node_type: NodeType) -> impl Iterator<Item = &Node> {
        self.nodes.of_type(node_type)
    }

    /// Node count per type; types with no nodes are absent.
    pub fn type_counts(&self) -> BTreeMap<NodeType, usize> {
        let mut counts = BTreeMap::new();
        for node in &self.nodes {
            *counts.entry(node.node_type()).or_insert(0) += 1;
        }
        counts
    }

    /// Edges whose source is `node`.
    pub fn edges_from<'a>(&'a self, node: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == *node)
    }

    /// Destinations of all previous trips, in creation order.
    pub fn trip_destinations(&self) -> Vec<String> {
        self.nodes_of_type(NodeType::PreviousTrip)
            .filter_map(|n| n.payload.as_trip())
            .map(|t| t.destination_or_unknown().to_owned())
            .collect()
    }

    /// Refresh `last_updated`, never moving it backwards.
    pub fn touch(&mut self) {
        self.last_updated = self.last_updated.max(Utc::now());
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Merge into the first node of the payload's type, or insert one.
    pub fn upsert_singleton(&mut self, mut payload: NodePayload) -> Result<NodeId> {
        let node_type = payload.node_type();
        if !node_type.is_singleton() {
            return Err(Error::Cardinality { node_type, reason: "multi-valued types are appended, not upserted" });
        }

        payload.stamp(Utc::now());
        let id = match self.nodes.first_of_type_mut(node_type) {
            Some(node) => {
                node.payload.merge(payload)?;
                node.id.clone()
            }
            None => self.insert_node(payload),
        };
        self.touch();
        Ok(id)
    }

    /// Insert a new node of a multi-valued type.
    ///
    /// A previous trip added while an interests node exists gets an
    /// `influenced_by` edge to it. The link is made once, here.
    pub fn append_node(&mut self, mut payload: NodePayload) -> Result<NodeId> {
        let node_type = payload.node_type();
        if node_type.is_singleton() {
            return Err(Error::Cardinality { node_type, reason: "singleton types are upserted, not appended" });
        }

        payload.stamp(Utc::now());
        let id = self.insert_node(payload);
        if node_type == NodeType::PreviousTrip {
            if let Some(interests) = self.find_node_by_type(NodeType::Interests) {
                let target = interests.id.clone();
                self.add_edge(id.clone(), target, INFLUENCED_BY);
            }
        }
        self.touch();
        Ok(id)
    }

    pub fn add_edge(&mut self, source: NodeId, target: NodeId, relationship: impl Into<String>) {
        self.edges.push(Edge::new(source, target, relationship));
        self.touch();
    }

    fn insert_node(&mut self, payload: NodePayload) -> NodeId {
        let id = self.fresh_node_id(payload.node_type());
        self.nodes.push(Node::new(id.clone(), payload, Utc::now()));
        self.touch();
        id
    }

    fn fresh_node_id(&self, node_type: NodeType) -> NodeId {
        loop {
            let id = NodeId::generate(&self.user_id, node_type);
            if !self.nodes.contains(&id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Budget, Interests, PreviousTrip, TravelPreferences, Visa, props};
    use pretty_assertions::assert_eq;

    fn profile() -> Profile {
        Profile::new(UserId::new("test_user_123").unwrap())
    }

    #[test]
    fn test_user_id_rejects_blank() {
        assert!(UserId::new("").is_err());
        assert!(UserId::new("   ").is_err());
        assert_eq!(&*UserId::new("abc").unwrap(), "abc");
        assert_eq!(UserId::generate().len(), 36);
    }

    #[test]
    fn test_singleton_upsert_merges() {
        let mut p = profile();
        let first = p.upsert_singleton(Budget::new("$2000", "USD").into()).unwrap();
        let second = p.upsert_singleton(Budget::range("$3000").into()).unwrap();

        assert_eq!(first, second);
        assert_eq!(p.node_count(), 1);
        let budget = p.node(&first).unwrap().payload.as_budget().unwrap();
        assert_eq!(budget.budget_range.as_deref(), Some("$3000"));
        assert_eq!(budget.currency.as_deref(), Some("USD"));
        assert!(budget.last_updated.is_some());
    }

    #[test]
    fn test_cardinality_enforced() {
        let mut p = profile();
        assert!(p.upsert_singleton(PreviousTrip::new("Paris").into()).is_err());
        assert!(p.append_node(Visa::default().into()).is_err());
        assert_eq!(p.node_count(), 0);
        assert_eq!(p.edge_count(), 0);
    }

    #[test]
    fn test_append_grows_by_one() {
        let mut p = profile();
        for i in 0..4 {
            p.append_node(TravelPreferences::new(props([("days", i)])).into()).unwrap();
            assert_eq!(p.node_count(), i as usize + 1);
        }
        assert_eq!(p.edge_count(), 0);
    }

    #[test]
    fn test_trip_links_to_existing_interests() {
        let mut p = profile();
        let lonely = p.append_node(PreviousTrip::new("Lisbon").into()).unwrap();
        assert_eq!(p.edge_count(), 0);

        let interests = p.upsert_singleton(Interests::new(["Culture", "Food"]).into()).unwrap();
        let trip = p.append_node(PreviousTrip::new("Paris").into()).unwrap();

        assert_eq!(p.edge_count(), 1);
        let edge = &p.edges[0];
        assert_eq!(edge.source, trip);
        assert_eq!(edge.target, interests);
        assert_eq!(edge.relationship, INFLUENCED_BY);
        // Not re-evaluated for earlier trips.
        assert_eq!(p.edges_from(&lonely).count(), 0);
    }

    #[test]
    fn test_type_counts_and_destinations() {
        let mut p = profile();
        p.upsert_singleton(Interests::new(["Culture"]).into()).unwrap();
        p.append_node(PreviousTrip::new("Paris").into()).unwrap();
        p.append_node(PreviousTrip::default().into()).unwrap();
        p.append_node(PreviousTrip::new("Kyoto").into()).unwrap();

        let counts = p.type_counts();
        assert_eq!(counts.get(&NodeType::Interests), Some(&1));
        assert_eq!(counts.get(&NodeType::PreviousTrip), Some(&3));
        assert_eq!(counts.get(&NodeType::Budget), None);
        assert_eq!(p.trip_destinations(), ["Paris", "Unknown", "Kyoto"]);
    }

    #[test]
    fn test_last_updated_monotonic() {
        let mut p = profile();
        let mut previous = p.last_updated;
        for _ in 0..3 {
            p.append_node(PreviousTrip::new("Oslo").into()).unwrap();
            assert!(p.last_updated >= previous);
            previous = p.last_updated;
        }
        p.add_edge(NodeId::from("a"), NodeId::from("b"), "related");
        assert!(p.last_updated >= previous);
        assert!(p.last_updated >= p.created_at);
    }

    #[test]
    fn test_node_map_keeps_insertion_order_through_json() {
        let mut p = profile();
        let ids: Vec<NodeId> = ["Zurich", "Athens", "Madrid"]
            .into_iter()
            .map(|d| p.append_node(PreviousTrip::new(d).into()).unwrap())
            .collect();

        let json = serde_json::to_string(&p).unwrap();
        let back: Profile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.nodes.ids().cloned().collect::<Vec<_>>(), ids);
        assert_eq!(back, p);
    }

    #[test]
    fn test_node_map_rejects_mismatched_key() {
        let json = serde_json::json!({
            "wrong_key": {
                "id": "u_budget_1",
                "type": "budget",
                "data": {},
                "created_at": "2024-01-01T00:00:00Z",
            }
        });
        assert!(serde_json::from_value::<NodeMap>(json).is_err());
    }
}
