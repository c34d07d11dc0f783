//! # Profile Repositories
//!
//! Durable homes for whole profiles. A repository stores one encoded
//! profile per user; the store decides when to write or read one.
//!
//! ## Implementations
//!
//! | Repository | Module | Description |
//! |---------|--------|-------------|
//! | `MemoryRepository` | `memory` | Encoded profiles in a map, for testing/embedding |
//! | `FileRepository` | `file` | One JSON file per profile (feature `fs`) |

pub mod memory;
#[cfg(feature = "fs")]
pub mod file;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{Profile, UserId};
use crate::Result;

pub use memory::MemoryRepository;
#[cfg(feature = "fs")]
pub use file::FileRepository;

/// Environment variable naming the profile directory.
pub const DATA_DIR_ENV: &str = "TRAVELER_GRAPH_DATA_DIR";

// ============================================================================
// Repository Configuration
// ============================================================================

/// Which repository to open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RepositoryConfig {
    /// In-memory (no persistence across restarts)
    #[default]
    Memory,

    /// `traveler_profile_{user_id}.json` files under `data_dir`
    #[cfg(feature = "fs")]
    File { data_dir: PathBuf },
}

impl RepositoryConfig {
    /// `File` when `TRAVELER_GRAPH_DATA_DIR` is set, otherwise `Memory`.
    pub fn from_env() -> Self {
        match std::env::var_os(DATA_DIR_ENV) {
            #[cfg(feature = "fs")]
            Some(dir) if !dir.is_empty() => RepositoryConfig::File { data_dir: PathBuf::from(dir) },
            _ => RepositoryConfig::Memory,
        }
    }

    pub fn open(&self) -> Result<Arc<dyn ProfileRepository>> {
        Ok(match self {
            RepositoryConfig::Memory => Arc::new(MemoryRepository::new()),
            #[cfg(feature = "fs")]
            RepositoryConfig::File { data_dir } => Arc::new(FileRepository::open(data_dir)?),
        })
    }
}

// ============================================================================
// ProfileRepository Trait
// ============================================================================

/// Storage contract for whole profiles.
#[async_trait]
pub trait ProfileRepository: Send + Sync + 'static {
    /// Store `profile`, replacing any previous copy for its user.
    async fn write(&self, profile: &Profile) -> Result<()>;

    /// Load a user's profile. `Error::NotFound` if none is stored.
    async fn read(&self, user_id: &str) -> Result<Profile>;

    /// Delete a user's profile. Returns true if one existed.
    async fn remove(&self, user_id: &str) -> Result<bool>;

    /// Users with a stored profile, sorted.
    async fn list(&self) -> Result<Vec<UserId>>;

    /// Whether a profile is stored for `user_id`.
    ///
    /// Default: attempt a read.
    async fn exists(&self, user_id: &str) -> Result<bool> {
        match self.read(user_id).await {
            Ok(_) => Ok(true),
            Err(crate::Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
