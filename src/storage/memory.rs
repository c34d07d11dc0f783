//! In-memory profile repository.
//!
//! Profiles are held in their encoded form so that writes and reads go
//! through the same codec as the file repository.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::codec;
use crate::model::{Profile, UserId};
use crate::{Error, Result};
use super::ProfileRepository;

#[derive(Default)]
pub struct MemoryRepository {
    profiles: RwLock<HashMap<UserId, Vec<u8>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.profiles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.read().is_empty()
    }
}

#[async_trait]
impl ProfileRepository for MemoryRepository {
    async fn write(&self, profile: &Profile) -> Result<()> {
        let bytes = codec::to_bytes(profile)?;
        self.profiles.write().insert(profile.user_id.clone(), bytes);
        Ok(())
    }

    async fn read(&self, user_id: &str) -> Result<Profile> {
        let profiles = self.profiles.read();
        let bytes = profiles
            .get(user_id)
            .ok_or_else(|| Error::NotFound(format!("stored profile {user_id}")))?;
        codec::from_bytes(bytes)
    }

    async fn remove(&self, user_id: &str) -> Result<bool> {
        Ok(self.profiles.write().remove(user_id).is_some())
    }

    async fn list(&self) -> Result<Vec<UserId>> {
        let mut ids: Vec<UserId> = self.profiles.read().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
