//! File-backed profile repository: one JSON file per profile.
//!
//! Files are named `traveler_profile_{user_id}.json`. Each write goes to
//! its own uniquely named temporary sibling and is renamed into place, so
//! a reader never sees a half-written profile and concurrent writers of
//! the same user never share a temp file. The last rename wins.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::codec;
use crate::model::{Profile, UserId};
use crate::{Error, Result};
use super::ProfileRepository;

const FILE_PREFIX: &str = "traveler_profile_";
const FILE_SUFFIX: &str = ".json";

pub struct FileRepository {
    data_dir: PathBuf,
}

impl FileRepository {
    /// Use `data_dir`, creating it if needed.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of a user's profile file. Ids that could escape the data
    /// directory are rejected.
    pub fn path_for(&self, user_id: &str) -> Result<PathBuf> {
        let unsafe_id = user_id.trim().is_empty()
            || user_id == "."
            || user_id == ".."
            || user_id.contains(['/', '\\', '\0']);
        if unsafe_id {
            tracing::warn!(user = user_id, "rejected user id for file storage");
            return Err(Error::InvalidUserId(user_id.to_owned()));
        }
        Ok(self.data_dir.join(format!("{FILE_PREFIX}{user_id}{FILE_SUFFIX}")))
    }
}

#[async_trait]
impl ProfileRepository for FileRepository {
    async fn write(&self, profile: &Profile) -> Result<()> {
        let path = self.path_for(&profile.user_id)?;
        let tmp = path.with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
        let bytes = codec::to_bytes(profile)?;

        if let Err(e) = write_atomic(&tmp, &path, &bytes).await {
            if let Err(cleanup) = fs::remove_file(&tmp).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!(path = %tmp.display(), error = %cleanup, "failed to remove temp file");
                }
            }
            return Err(e.into());
        }

        tracing::debug!(user = %profile.user_id, path = %path.display(), "wrote profile");
        Ok(())
    }

    async fn read(&self, user_id: &str) -> Result<Profile> {
        let path = self.path_for(user_id)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::NotFound(format!("stored profile {user_id}")));
            }
            Err(e) => return Err(e.into()),
        };
        codec::from_bytes(&bytes)
    }

    async fn remove(&self, user_id: &str) -> Result<bool> {
        let path = self.path_for(user_id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<UserId>> {
        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&self.data_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(id) = name
                .strip_prefix(FILE_PREFIX)
                .and_then(|rest| rest.strip_suffix(FILE_SUFFIX))
            else {
                continue;
            };
            if let Ok(id) = UserId::new(id) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Write `bytes` to a fresh `tmp` file, then rename it over `path`.
async fn write_atomic(tmp: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new().write(true).create_new(true).open(tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(tmp, path).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::{Interests, PreviousTrip};

    #[tokio::test]
    async fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileRepository::open(dir.path()).unwrap();

        let mut p = Profile::new(UserId::new("test_user_123").unwrap());
        p.upsert_singleton(Interests::new(["Culture", "Food"]).into()).unwrap();
        p.append_node(PreviousTrip::new("Paris").into()).unwrap();

        repo.write(&p).await.unwrap();
        assert!(dir.path().join("traveler_profile_test_user_123.json").exists());
        assert_eq!(repo.read("test_user_123").await.unwrap(), p);
        assert_eq!(repo.list().await.unwrap(), vec![p.user_id.clone()]);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileRepository::open(dir.path()).unwrap();
        assert!(matches!(repo.read("ghost").await, Err(Error::NotFound(_))));
        assert!(!repo.remove("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn test_path_escape_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileRepository::open(dir.path()).unwrap();
        for bad in ["../etc", "a/b", "..", "a\\b"] {
            assert!(matches!(repo.path_for(bad), Err(Error::InvalidUserId(_))), "{bad}");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_writes_same_user() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(FileRepository::open(dir.path()).unwrap());

        for round in 0..10 {
            let mut p = Profile::new(UserId::new("racer").unwrap());
            p.append_node(PreviousTrip::new(format!("round-{round}")).into()).unwrap();
            let p = Arc::new(p);

            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let repo = Arc::clone(&repo);
                    let p = Arc::clone(&p);
                    tokio::spawn(async move { repo.write(&p).await })
                })
                .collect();
            for handle in handles {
                handle.await.unwrap().unwrap();
            }
            assert_eq!(repo.read("racer").await.unwrap(), *p);
        }

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["traveler_profile_racer.json"]);
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileRepository::open(dir.path()).unwrap();
        // A directory in the target's place makes the rename fail.
        std::fs::create_dir(dir.path().join("traveler_profile_blocked.json")).unwrap();
        std::fs::write(dir.path().join("traveler_profile_blocked.json").join("keep"), b"x").unwrap();

        let p = Profile::new(UserId::new("blocked").unwrap());
        assert!(matches!(repo.write(&p).await, Err(Error::Io(_))));

        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileRepository::open(dir.path()).unwrap();
        std::fs::write(dir.path().join("traveler_profile_broken.json"), b"{\"nodes\": {}").unwrap();
        assert!(matches!(repo.read("broken").await, Err(Error::MalformedInput(_))));
    }
}
