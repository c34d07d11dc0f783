//! Profile summary: counts plus the handful of fields callers display.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{NodeType, Profile, UserId};

/// Key fields projected from singleton nodes. Absent sources are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
}

impl ProfileData {
    pub fn is_empty(&self) -> bool {
        self.budget.is_none() && self.interests.is_none() && self.nationality.is_none()
    }
}

/// Read-only projection of a profile.
///
/// `Summary::default()` is what an unknown user summarizes to: no user id,
/// no timestamps, zero counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    pub node_count: usize,
    pub edge_count: usize,
    pub node_type_counts: BTreeMap<NodeType, usize>,
    pub profile_data: ProfileData,
}

impl Summary {
    /// True for the summary of an unknown profile.
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none()
    }
}

/// Summarize a profile.
pub fn summarize(profile: &Profile) -> Summary {
    Summary {
        user_id: Some(profile.user_id.clone()),
        created_at: Some(profile.created_at),
        last_updated: Some(profile.last_updated),
        node_count: profile.node_count(),
        edge_count: profile.edge_count(),
        node_type_counts: profile.type_counts(),
        profile_data: project(profile),
    }
}

fn project(profile: &Profile) -> ProfileData {
    let budget = profile
        .find_node_by_type(NodeType::Budget)
        .and_then(|n| n.payload.as_budget())
        .and_then(|b| b.budget_range.clone());
    let interests = profile
        .find_node_by_type(NodeType::Interests)
        .and_then(|n| n.payload.as_interests())
        .and_then(|i| i.interests.clone());
    let nationality = profile
        .find_node_by_type(NodeType::Visa)
        .and_then(|n| n.payload.as_visa())
        .and_then(|v| v.nationality.clone());

    ProfileData { budget, interests, nationality }
}
