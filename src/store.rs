//! The profile store: owns every traveler's profile.
//!
//! ## Locking
//!
//! The profile table is a `RwLock<HashMap<UserId, Arc<RwLock<Profile>>>>`.
//! The outer lock is held only long enough to find, insert or remove a
//! profile handle. Each operation then locks that one profile: write for
//! mutations, read for views. Requests for different users never wait on
//! each other; requests for the same user serialize. No lock is held
//! across calls.
//!
//! A handle obtained just before `delete_profile` may still be mutated by
//! an in-flight call; that write lands on the detached profile and is
//! dropped with it.

use std::io::Write;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::codec;
use crate::config::{CreatePolicy, StoreConfig};
use crate::context::ProfileContext;
use crate::export::{self, TravelPlan};
use crate::model::*;
use crate::recommend::{self, Recommendations};
use crate::storage::ProfileRepository;
use crate::summary::{self, Summary};
use crate::{Error, Result};

type SharedProfile = Arc<RwLock<Profile>>;

/// In-memory store of traveler profiles.
///
/// Construct one at startup and share it (`&ProfileStore` or
/// `Arc<ProfileStore>`) with every request handler.
#[derive(Default)]
pub struct ProfileStore {
    config: StoreConfig,
    profiles: RwLock<HashMap<UserId, SharedProfile>>,
}

impl ProfileStore {
    pub fn new(config: StoreConfig) -> Self {
        Self { config, profiles: RwLock::new(HashMap::new()) }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.profiles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.read().is_empty()
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.profiles.read().contains_key(user_id)
    }

    /// Users with a profile, sorted.
    pub fn user_ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.profiles.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    // ========================================================================
    // Handles
    // ========================================================================

    fn handle(&self, user_id: &str) -> Option<SharedProfile> {
        self.profiles.read().get(user_id).cloned()
    }

    fn handle_or_create(&self, user_id: &str) -> Result<SharedProfile> {
        if let Some(shared) = self.handle(user_id) {
            return Ok(shared);
        }
        let user = parse_user_id(user_id)?;
        let mut profiles = self.profiles.write();
        let shared = profiles
            .entry(user.clone())
            .or_insert_with(|| {
                tracing::info!(user = %user, "auto-created profile");
                Arc::new(RwLock::new(Profile::new(user)))
            })
            .clone();
        Ok(shared)
    }

    /// Run `f` under the profile's write lock; creates the profile if needed.
    fn write_profile<T>(&self, user_id: &str, f: impl FnOnce(&mut Profile) -> Result<T>) -> Result<T> {
        let shared = self.handle_or_create(user_id)?;
        let mut profile = shared.write();
        f(&mut profile)
    }

    /// Run `f` under the profile's read lock; `None` for unknown users.
    fn read_profile<T>(&self, user_id: &str, f: impl FnOnce(&Profile) -> T) -> Option<T> {
        let shared = self.handle(user_id)?;
        let profile = shared.read();
        Some(f(&profile))
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create an empty profile, with a random id when none is given.
    ///
    /// An existing id is rejected or reset according to
    /// `StoreConfig::on_existing`.
    pub fn create_profile(&self, user_id: Option<&str>) -> Result<UserId> {
        let user = match user_id {
            Some(id) => parse_user_id(id)?,
            None => UserId::generate(),
        };

        let mut profiles = self.profiles.write();
        if profiles.contains_key(user.as_str()) {
            match self.config.on_existing {
                CreatePolicy::Reject => {
                    tracing::warn!(user = %user, "profile already exists");
                    return Err(Error::ProfileExists(user));
                }
                CreatePolicy::Reset => tracing::info!(user = %user, "resetting existing profile"),
            }
        }
        profiles.insert(user.clone(), Arc::new(RwLock::new(Profile::new(user.clone()))));
        tracing::info!(user = %user, "created profile");
        Ok(user)
    }

    /// Remove a profile. Returns true if it existed.
    pub fn delete_profile(&self, user_id: &str) -> bool {
        let removed = self.profiles.write().remove(user_id).is_some();
        if removed {
            tracing::info!(user = user_id, "deleted profile");
        }
        removed
    }

    // ========================================================================
    // Node writes
    // ========================================================================

    /// Merge `payload` into the user's node of that type, or create it.
    /// Only singleton types (budget, interests, visa) are accepted.
    pub fn upsert_singleton(&self, user_id: &str, payload: impl Into<NodePayload>) -> Result<NodeId> {
        let payload = payload.into();
        let node_type = payload.node_type();
        if !node_type.is_singleton() {
            return Err(Error::Cardinality { node_type, reason: "multi-valued types are appended, not upserted" });
        }
        let id = self.write_profile(user_id, |p| p.upsert_singleton(payload))?;
        tracing::debug!(user = user_id, node = %id, %node_type, "upserted node");
        Ok(id)
    }

    /// Add a node of a multi-valued type (previous trip, travel preferences).
    pub fn append_node(&self, user_id: &str, payload: impl Into<NodePayload>) -> Result<NodeId> {
        let payload = payload.into();
        let node_type = payload.node_type();
        if node_type.is_singleton() {
            return Err(Error::Cardinality { node_type, reason: "singleton types are upserted, not appended" });
        }
        let id = self.write_profile(user_id, |p| p.append_node(payload))?;
        tracing::debug!(user = user_id, node = %id, %node_type, "appended node");
        Ok(id)
    }

    pub fn update_budget(&self, user_id: &str, budget_range: &str, currency: &str) -> Result<NodeId> {
        self.upsert_singleton(user_id, Budget::new(budget_range, currency))
    }

    pub fn update_interests<S: Into<String>>(
        &self,
        user_id: &str,
        interests: impl IntoIterator<Item = S>,
    ) -> Result<NodeId> {
        self.upsert_singleton(user_id, Interests::new(interests))
    }

    pub fn update_visa(&self, user_id: &str, nationality: &str, requirements: PropertyMap) -> Result<NodeId> {
        self.upsert_singleton(user_id, Visa::new(nationality, requirements))
    }

    /// Record a past trip; `details` keys (duration, budget, ...) are kept
    /// alongside the destination. A `trip_date` detail must be a string.
    pub fn add_previous_trip(&self, user_id: &str, destination: &str, mut details: PropertyMap) -> Result<NodeId> {
        let mut trip = PreviousTrip::new(destination);
        match details.remove("trip_date") {
            Some(Value::String(date)) => trip.trip_date = Some(date),
            Some(other) => {
                tracing::warn!(user = user_id, kind = other.type_name(), "rejected trip_date");
                return Err(Error::MalformedInput(format!(
                    "trip_date must be a string, got {}",
                    other.type_name()
                )));
            }
            None => {}
        }
        details.remove("destination");
        trip.extra = details;
        self.append_node(user_id, trip)
    }

    pub fn add_travel_preferences(&self, user_id: &str, preferences: PropertyMap) -> Result<NodeId> {
        self.append_node(user_id, TravelPreferences::new(preferences))
    }

    // ========================================================================
    // Edges
    // ========================================================================

    /// Append an edge. Endpoints are not checked; the user must exist.
    pub fn add_edge(
        &self,
        user_id: &str,
        source: NodeId,
        target: NodeId,
        relationship: impl Into<String>,
    ) -> Result<()> {
        let shared = self
            .handle(user_id)
            .ok_or_else(|| Error::NotFound(format!("profile {user_id}")))?;
        let relationship = relationship.into();
        tracing::debug!(user = user_id, %source, %target, %relationship, "added edge");
        shared.write().add_edge(source, target, relationship);
        Ok(())
    }

    /// Edges leaving `node`; empty for unknown users or nodes.
    pub fn edges_from(&self, user_id: &str, node: &NodeId) -> Vec<Edge> {
        self.read_profile(user_id, |p| p.edges_from(node).cloned().collect())
            .unwrap_or_default()
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// First node of `node_type` in insertion order.
    pub fn find_node_by_type(&self, user_id: &str, node_type: NodeType) -> Option<NodeId> {
        self.read_profile(user_id, |p| p.find_node_by_type(node_type).map(|n| n.id.clone()))
            .flatten()
    }

    pub fn node(&self, user_id: &str, id: &NodeId) -> Option<Node> {
        self.read_profile(user_id, |p| p.node(id).cloned()).flatten()
    }

    /// A snapshot copy of the profile.
    pub fn profile(&self, user_id: &str) -> Result<Profile> {
        self.read_profile(user_id, Profile::clone)
            .ok_or_else(|| Error::NotFound(format!("profile {user_id}")))
    }

    /// Summary of the profile; `Summary::default()` for unknown users.
    pub fn summarize(&self, user_id: &str) -> Summary {
        self.read_profile(user_id, summary::summarize).unwrap_or_default()
    }

    /// Recommendations for `destination`; empty for unknown users.
    pub fn recommend(&self, user_id: &str, destination: &str) -> Recommendations {
        self.read_profile(user_id, |p| recommend::recommend(p, destination))
            .unwrap_or_default()
    }

    /// Context map for prompt templating; empty for unknown users.
    pub fn context(&self, user_id: &str) -> ProfileContext {
        self.read_profile(user_id, ProfileContext::from_profile).unwrap_or_default()
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Encode the user's profile.
    pub fn save(&self, user_id: &str) -> Result<Vec<u8>> {
        self.read_profile(user_id, codec::to_bytes)
            .ok_or_else(|| Error::NotFound(format!("profile {user_id}")))?
    }

    /// Decode a profile and install it under its embedded user id,
    /// replacing any profile already there. Malformed input changes nothing.
    pub fn load(&self, bytes: &[u8]) -> Result<UserId> {
        let profile = codec::from_bytes(bytes).inspect_err(|e| {
            tracing::warn!(error = %e, "rejected profile load");
        })?;
        Ok(self.install(profile))
    }

    fn install(&self, profile: Profile) -> UserId {
        let user = profile.user_id.clone();
        let replaced = self
            .profiles
            .write()
            .insert(user.clone(), Arc::new(RwLock::new(profile)))
            .is_some();
        tracing::info!(user = %user, replaced, "loaded profile");
        user
    }

    /// Write the user's profile to `repo`.
    pub async fn persist(&self, repo: &dyn ProfileRepository, user_id: &str) -> Result<()> {
        let snapshot = self.profile(user_id)?;
        repo.write(&snapshot).await
    }

    /// Read the user's profile from `repo` and install it.
    pub async fn restore(&self, repo: &dyn ProfileRepository, user_id: &str) -> Result<UserId> {
        let profile = repo.read(user_id).await?;
        Ok(self.install(profile))
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// CSV export of the user's summary and the given plans.
    pub fn export_csv(&self, user_id: &str, plans: &[TravelPlan], writer: &mut dyn Write) -> Result<()> {
        let summary = self
            .read_profile(user_id, summary::summarize)
            .ok_or_else(|| Error::NotFound(format!("profile {user_id}")))?;
        export::export_csv(&summary, plans, writer)
    }
}

fn parse_user_id(user_id: &str) -> Result<UserId> {
    UserId::new(user_id).inspect_err(|_| tracing::warn!(user = user_id, "rejected user id"))
}

// ============================================================================
// Tests
// ============================================================================
