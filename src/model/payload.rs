//! Typed node payloads: one shape per `NodeType`.
//!
//! Every field is optional so a payload can describe a *partial* update.
//! Upserting a singleton merges the incoming payload into the stored one
//! field by field: absent fields keep the stored value, present fields
//! overwrite it. Keys a payload does not model land in `extra` and merge
//! key by key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use super::{NodeType, PropertyMap, Value};
use crate::{Error, Result};

/// Field-wise merge of a newer partial value into `self`.
pub trait Merge {
    fn merge(&mut self, newer: Self);
}

fn merge_field<T>(slot: &mut Option<T>, newer: Option<T>) {
    if newer.is_some() {
        *slot = newer;
    }
}

// ============================================================================
// Budget
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: PropertyMap,
}

impl Budget {
    pub fn new(budget_range: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            budget_range: Some(budget_range.into()),
            currency: Some(currency.into()),
            ..Default::default()
        }
    }

    /// Only the range; merging this keeps the stored currency.
    pub fn range(budget_range: impl Into<String>) -> Self {
        Self { budget_range: Some(budget_range.into()), ..Default::default() }
    }
}

impl Merge for Budget {
    fn merge(&mut self, newer: Self) {
        merge_field(&mut self.budget_range, newer.budget_range);
        merge_field(&mut self.currency, newer.currency);
        merge_field(&mut self.last_updated, newer.last_updated);
        self.extra.extend(newer.extra);
    }
}

// ============================================================================
// Interests
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Interests {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,
    /// Always the length of `interests` when that list is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: PropertyMap,
}

impl Interests {
    pub fn new<S: Into<String>>(interests: impl IntoIterator<Item = S>) -> Self {
        let interests: Vec<String> = interests.into_iter().map(Into::into).collect();
        Self {
            count: Some(interests.len()),
            interests: Some(interests),
            ..Default::default()
        }
    }

    pub fn list(&self) -> &[String] {
        self.interests.as_deref().unwrap_or_default()
    }
}

impl Merge for Interests {
    fn merge(&mut self, newer: Self) {
        merge_field(&mut self.interests, newer.interests);
        merge_field(&mut self.count, newer.count);
        merge_field(&mut self.last_updated, newer.last_updated);
        self.extra.extend(newer.extra);
        if let Some(list) = &self.interests {
            self.count = Some(list.len());
        }
    }
}

// ============================================================================
// Visa
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Visa {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    /// Replaced as a whole on merge, not key by key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visa_requirements: Option<PropertyMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: PropertyMap,
}

impl Visa {
    pub fn new(nationality: impl Into<String>, visa_requirements: PropertyMap) -> Self {
        Self {
            nationality: Some(nationality.into()),
            visa_requirements: Some(visa_requirements),
            ..Default::default()
        }
    }
}

impl Merge for Visa {
    fn merge(&mut self, newer: Self) {
        merge_field(&mut self.nationality, newer.nationality);
        merge_field(&mut self.visa_requirements, newer.visa_requirements);
        merge_field(&mut self.last_updated, newer.last_updated);
        self.extra.extend(newer.extra);
    }
}

// ============================================================================
// PreviousTrip
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviousTrip {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Free-form date as entered (`"2023-06-15"`), or the insertion time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_date: Option<String>,
    #[serde(flatten)]
    pub extra: PropertyMap,
}

impl PreviousTrip {
    pub fn new(destination: impl Into<String>) -> Self {
        Self { destination: Some(destination.into()), ..Default::default() }
    }

    pub fn with_date(mut self, trip_date: impl Into<String>) -> Self {
        self.trip_date = Some(trip_date.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn destination_or_unknown(&self) -> &str {
        self.destination.as_deref().unwrap_or("Unknown")
    }
}

impl Merge for PreviousTrip {
    fn merge(&mut self, newer: Self) {
        merge_field(&mut self.destination, newer.destination);
        merge_field(&mut self.trip_date, newer.trip_date);
        self.extra.extend(newer.extra);
    }
}

// ============================================================================
// TravelPreferences
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TravelPreferences {
    #[serde(default)]
    pub preferences: PropertyMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: PropertyMap,
}

impl TravelPreferences {
    pub fn new(preferences: PropertyMap) -> Self {
        Self { preferences, ..Default::default() }
    }
}

impl Merge for TravelPreferences {
    fn merge(&mut self, newer: Self) {
        self.preferences.extend(newer.preferences);
        merge_field(&mut self.last_updated, newer.last_updated);
        self.extra.extend(newer.extra);
    }
}

// ============================================================================
// NodePayload
// ============================================================================

/// Data carried by a node, tagged by its `NodeType`.
#[derive(Debug, Clone, PartialEq)]
pub enum NodePayload {
    Budget(Budget),
    Interests(Interests),
    PreviousTrip(PreviousTrip),
    Visa(Visa),
    TravelPreferences(TravelPreferences),
}

impl NodePayload {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodePayload::Budget(_) => NodeType::Budget,
            NodePayload::Interests(_) => NodeType::Interests,
            NodePayload::PreviousTrip(_) => NodeType::PreviousTrip,
            NodePayload::Visa(_) => NodeType::Visa,
            NodePayload::TravelPreferences(_) => NodeType::TravelPreferences,
        }
    }

    /// Decode the `data` object of a persisted node.
    pub fn from_parts(node_type: NodeType, data: serde_json::Value) -> serde_json::Result<Self> {
        fn decode<T: DeserializeOwned>(data: serde_json::Value) -> serde_json::Result<T> {
            serde_json::from_value(data)
        }
        Ok(match node_type {
            NodeType::Budget => NodePayload::Budget(decode(data)?),
            NodeType::Interests => NodePayload::Interests(decode(data)?),
            NodeType::PreviousTrip => NodePayload::PreviousTrip(decode(data)?),
            NodeType::Visa => NodePayload::Visa(decode(data)?),
            NodeType::TravelPreferences => NodePayload::TravelPreferences(decode(data)?),
        })
    }

    /// Encode as the `data` object of a persisted node.
    pub fn to_data(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            NodePayload::Budget(p) => serde_json::to_value(p),
            NodePayload::Interests(p) => serde_json::to_value(p),
            NodePayload::PreviousTrip(p) => serde_json::to_value(p),
            NodePayload::Visa(p) => serde_json::to_value(p),
            NodePayload::TravelPreferences(p) => serde_json::to_value(p),
        }
    }

    /// Merge `newer` into `self`. Both must be the same variant.
    pub fn merge(&mut self, newer: NodePayload) -> Result<()> {
        match (self, newer) {
            (NodePayload::Budget(a), NodePayload::Budget(b)) => a.merge(b),
            (NodePayload::Interests(a), NodePayload::Interests(b)) => a.merge(b),
            (NodePayload::PreviousTrip(a), NodePayload::PreviousTrip(b)) => a.merge(b),
            (NodePayload::Visa(a), NodePayload::Visa(b)) => a.merge(b),
            (NodePayload::TravelPreferences(a), NodePayload::TravelPreferences(b)) => a.merge(b),
            (existing, incoming) => {
                return Err(Error::TypeMismatch {
                    existing: existing.node_type(),
                    incoming: incoming.node_type(),
                });
            }
        }
        Ok(())
    }

    /// Apply write-time bookkeeping: `last_updated` on updatable payloads,
    /// a default `trip_date` on trips.
    pub fn stamp(&mut self, now: DateTime<Utc>) {
        match self {
            NodePayload::Budget(p) => p.last_updated = Some(now),
            NodePayload::Interests(p) => {
                p.last_updated = Some(now);
                if let Some(list) = &p.interests {
                    p.count = Some(list.len());
                }
            }
            NodePayload::Visa(p) => p.last_updated = Some(now),
            NodePayload::TravelPreferences(p) => p.last_updated = Some(now),
            NodePayload::PreviousTrip(p) => {
                if p.trip_date.is_none() {
                    p.trip_date = Some(now.to_rfc3339());
                }
            }
        }
    }

    pub fn as_budget(&self) -> Option<&Budget> {
        match self { NodePayload::Budget(p) => Some(p), _ => None }
    }

    pub fn as_interests(&self) -> Option<&Interests> {
        match self { NodePayload::Interests(p) => Some(p), _ => None }
    }

    pub fn as_visa(&self) -> Option<&Visa> {
        match self { NodePayload::Visa(p) => Some(p), _ => None }
    }

    pub fn as_trip(&self) -> Option<&PreviousTrip> {
        match self { NodePayload::PreviousTrip(p) => Some(p), _ => None }
    }

    pub fn as_preferences(&self) -> Option<&TravelPreferences> {
        match self { NodePayload::TravelPreferences(p) => Some(p), _ => None }
    }
}

impl From<Budget> for NodePayload { fn from(p: Budget) -> Self { NodePayload::Budget(p) } }
impl From<Interests> for NodePayload { fn from(p: Interests) -> Self { NodePayload::Interests(p) } }
impl From<PreviousTrip> for NodePayload { fn from(p: PreviousTrip) -> Self { NodePayload::PreviousTrip(p) } }
impl From<Visa> for NodePayload { fn from(p: Visa) -> Self { NodePayload::Visa(p) } }
impl From<TravelPreferences> for NodePayload {
    fn from(p: TravelPreferences) -> Self { NodePayload::TravelPreferences(p) }
}
