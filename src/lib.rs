//! # traveler-graph: Per-Traveler Personalization Graphs
//!
//! Each traveler owns a small property graph of typed facts (budget,
//! interests, visa status, past trips, travel preferences). The store keeps
//! one graph per user, merges updates into singleton facts, and derives
//! read-only views: a summary, destination recommendations, and a context
//! map for prompt templating.
//!
//! ## Design Principles
//!
//! 1. **Typed payloads**: every node carries a `NodePayload` variant, never a loose map
//! 2. **Per-profile locking**: different users never contend; one user's writes serialize
//! 3. **Views are pure**: `summarize`, `recommend` and `ProfileContext` only read
//! 4. **Trait-first persistence**: `ProfileRepository` is the contract with durable storage
//!
//! ## Quick Start
//!
//! ```rust
//! use traveler_graph::{ProfileStore, StoreConfig, NodeType};
//!
//! # fn example() -> traveler_graph::Result<()> {
//! let store = ProfileStore::new(StoreConfig::default());
//! let user = store.create_profile(Some("test_user_123"))?;
//!
//! store.update_budget(&user, "$1000-$3000", "USD")?;
//! store.update_interests(&user, ["Culture", "Food", "Nature"])?;
//!
//! let summary = store.summarize(&user);
//! assert_eq!(summary.node_count, 2);
//! assert!(store.find_node_by_type(&user, NodeType::Budget).is_some());
//!
//! let recs = store.recommend(&user, "Tokyo");
//! assert_eq!(recs.interest_based_suggestions[0], "Focus on culture activities in Tokyo");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Repositories
//!
//! | Repository | Feature | Description |
//! |---------|---------|-------------|
//! | Memory | (default) | Encoded profiles held in a map |
//! | File | `fs` | `traveler_profile_{user_id}.json` per profile |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod store;
pub mod summary;
pub mod context;
pub mod recommend;
pub mod codec;
pub mod storage;
pub mod export;
pub mod config;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    Node, NodeId, NodeType, NodePayload, Edge, Profile, UserId,
    Budget, Interests, Visa, PreviousTrip, TravelPreferences,
    Value, PropertyMap, props,
};

// ============================================================================
// Re-exports: Store and views
// ============================================================================

pub use store::ProfileStore;
pub use config::{CreatePolicy, StoreConfig};
pub use summary::{ProfileData, Summary};
pub use context::ProfileContext;
pub use recommend::Recommendations;
pub use export::TravelPlan;

// ============================================================================
// Re-exports: Storage
// ============================================================================

pub use storage::{ProfileRepository, RepositoryConfig, MemoryRepository};
#[cfg(feature = "fs")]
pub use storage::FileRepository;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Profile already exists: {0}")]
    ProfileExists(UserId),

    #[error("Invalid user id: {0:?}")]
    InvalidUserId(String),

    #[error("Cardinality violation for {node_type}: {reason}")]
    Cardinality { node_type: NodeType, reason: &'static str },

    #[error("Type mismatch: cannot merge {incoming} into {existing}")]
    TypeMismatch { existing: NodeType, incoming: NodeType },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        match e.classify() {
            serde_json::error::Category::Io => Error::Io(e.into()),
            _ => Error::MalformedInput(e.to_string()),
        }
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::Io(e.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
