use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::SavedRecords;
use crate::errors::BackendError;
use crate::tutorial::UnknownLabel;

/// How far along a user is with a saved tutorial. Any status can follow
/// any other.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SavedStatus {
    Saved,
    InProgress,
    Completed,
}

impl SavedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SavedStatus::Saved => "saved",
            SavedStatus::InProgress => "in-progress",
            SavedStatus::Completed => "completed",
        }
    }
}

impl Default for SavedStatus {
    fn default() -> Self {
        SavedStatus::Saved
    }
}

impl FromStr for SavedStatus {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "saved" => Ok(SavedStatus::Saved),
            "in-progress" => Ok(SavedStatus::InProgress),
            "completed" => Ok(SavedStatus::Completed),
            _ => Err(UnknownLabel(s.to_owned())),
        }
    }
}

/// A reference from one user to one tutorial.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedTutorial {
    pub tutorial_id: Uuid,
    pub status: SavedStatus,
}

/// The saved tutorials of a single owner.
pub trait SavedTutorialsStore: Send + Sync {
    fn list(&self) -> BoxFuture<Result<Vec<SavedTutorial>, BackendError>>;

    /// Saves the tutorial if it is not saved and unsaves it (dropping its
    /// status) if it is. Returns whether it is now saved.
    fn toggle_save(&self, tutorial_id: &Uuid) -> BoxFuture<Result<bool, BackendError>>;

    /// Fails with `NotFound` unless the tutorial is saved.
    fn set_status(&self, tutorial_id: &Uuid, status: SavedStatus) -> BoxFuture<Result<(), BackendError>>;

    fn remove(&self, tutorial_id: &Uuid) -> BoxFuture<Result<(), BackendError>>;
}

/// The state kept for visitors without an identity, in the same shape a
/// browser keeps it.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalState {
    #[serde(default)]
    pub saved_tutorials: Vec<Uuid>,

    #[serde(default)]
    pub tutorial_statuses: BTreeMap<Uuid, SavedStatus>,
}

/// Anonymous saved-tutorial store, optionally mirrored to a JSON file.
pub struct LocalSavedStore {
    state: RwLock<LocalState>,
    path: Option<PathBuf>,
}

impl LocalSavedStore {
    /// Creates an empty store that is never persisted.
    pub fn in_memory() -> Self {
        LocalSavedStore {
            state: RwLock::new(LocalState::default()),
            path: None,
        }
    }

    /// Loads the store from `path`, starting empty if the file does not
    /// exist yet. Every change is written back to the same file.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let path = path.into();

        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| BackendError::Json { source })?
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => LocalState::default(),
            Err(source) => return Err(BackendError::Io { source }),
        };

        Ok(LocalSavedStore {
            state: RwLock::new(state),
            path: Some(path),
        })
    }

    pub async fn snapshot(&self) -> LocalState {
        self.state.read().await.clone()
    }

    /// Applies `change` to a copy of the state and keeps the copy only
    /// once it has been written out.
    async fn update<T>(
        &self,
        change: impl FnOnce(&mut LocalState) -> Result<T, BackendError>,
    ) -> Result<T, BackendError> {
        let mut state = self.state.write().await;

        let mut next = state.clone();
        let result = change(&mut next)?;

        self.persist(&next).await?;
        *state = next;

        Ok(result)
    }

    async fn persist(&self, state: &LocalState) -> Result<(), BackendError> {
        let path = match &self.path {
            Some(path) => path,
            None => return Ok(()),
        };

        let bytes = serde_json::to_vec(state).map_err(|source| BackendError::Json { source })?;

        tokio::fs::write(path, bytes)
            .await
            .map_err(|source| BackendError::Io { source })
    }
}

impl SavedTutorialsStore for LocalSavedStore {
    fn list(&self) -> BoxFuture<Result<Vec<SavedTutorial>, BackendError>> {
        async move {
            let state = self.state.read().await;

            let saved = state
                .saved_tutorials
                .iter()
                .map(|id| SavedTutorial {
                    tutorial_id: *id,
                    status: state.tutorial_statuses.get(id).copied().unwrap_or_default(),
                })
                .collect();

            Ok(saved)
        }
        .boxed()
    }

    fn toggle_save(&self, tutorial_id: &Uuid) -> BoxFuture<Result<bool, BackendError>> {
        let id = *tutorial_id;

        async move {
            self.update(move |state| {
                if state.saved_tutorials.contains(&id) {
                    state.saved_tutorials.retain(|saved| *saved != id);
                    state.tutorial_statuses.remove(&id);
                    Ok(false)
                } else {
                    state.saved_tutorials.push(id);
                    state.tutorial_statuses.insert(id, SavedStatus::Saved);
                    Ok(true)
                }
            })
            .await
        }
        .boxed()
    }

    fn set_status(&self, tutorial_id: &Uuid, status: SavedStatus) -> BoxFuture<Result<(), BackendError>> {
        let id = *tutorial_id;

        async move {
            self.update(move |state| {
                if !state.saved_tutorials.contains(&id) {
                    return Err(BackendError::NotFound(id));
                }

                state.tutorial_statuses.insert(id, status);
                Ok(())
            })
            .await
        }
        .boxed()
    }

    fn remove(&self, tutorial_id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
        let id = *tutorial_id;

        async move {
            self.update(move |state| {
                state.saved_tutorials.retain(|saved| *saved != id);
                state.tutorial_statuses.remove(&id);
                Ok(())
            })
            .await
        }
        .boxed()
    }
}

/// Saved-tutorial store for an identified user, backed by the database.
pub struct UserSavedStore {
    records: Arc<dyn SavedRecords>,
    user: String,
}

impl UserSavedStore {
    pub fn new(records: Arc<dyn SavedRecords>, user: impl Into<String>) -> Self {
        UserSavedStore {
            records,
            user: user.into(),
        }
    }
}

impl SavedTutorialsStore for UserSavedStore {
    fn list(&self) -> BoxFuture<Result<Vec<SavedTutorial>, BackendError>> {
        self.records.list_saved(&self.user)
    }

    fn toggle_save(&self, tutorial_id: &Uuid) -> BoxFuture<Result<bool, BackendError>> {
        let id = *tutorial_id;

        async move {
            if self.records.delete_saved(&self.user, &id).await? {
                return Ok(false);
            }

            self.records
                .insert_saved(&self.user, &id, SavedStatus::Saved)
                .await?;

            Ok(true)
        }
        .boxed()
    }

    fn set_status(&self, tutorial_id: &Uuid, status: SavedStatus) -> BoxFuture<Result<(), BackendError>> {
        let id = *tutorial_id;

        async move {
            if self.records.update_saved_status(&self.user, &id, status).await? {
                Ok(())
            } else {
                Err(BackendError::NotFound(id))
            }
        }
        .boxed()
    }

    fn remove(&self, tutorial_id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
        let id = *tutorial_id;

        async move {
            let _ = self.records.delete_saved(&self.user, &id).await?;

            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryDb;

    async fn exercise(store: &dyn SavedTutorialsStore) {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        assert!(store.toggle_save(&first).await.unwrap());
        assert!(store.toggle_save(&second).await.unwrap());
        store.set_status(&first, SavedStatus::Completed).await.unwrap();
        store.set_status(&first, SavedStatus::Saved).await.unwrap();
        store.set_status(&first, SavedStatus::InProgress).await.unwrap();

        assert_eq!(
            store.list().await.unwrap(),
            vec![
                SavedTutorial { tutorial_id: first, status: SavedStatus::InProgress },
                SavedTutorial { tutorial_id: second, status: SavedStatus::Saved },
            ]
        );

        // toggling twice restores membership and drops the status
        assert!(!store.toggle_save(&first).await.unwrap());
        assert!(store.toggle_save(&first).await.unwrap());

        let statuses: Vec<_> = store.list().await.unwrap().into_iter().map(|s| s.status).collect();
        assert_eq!(statuses, vec![SavedStatus::Saved, SavedStatus::Saved]);

        store.remove(&second).await.unwrap();
        store.remove(&second).await.unwrap();

        let missing = store.set_status(&second, SavedStatus::Completed).await;
        assert!(matches!(missing, Err(BackendError::NotFound(id)) if id == second));

        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn local_store_tracks_saves() {
        exercise(&LocalSavedStore::in_memory()).await;
    }

    #[tokio::test]
    async fn user_store_tracks_saves() {
        let db = Arc::new(MemoryDb::new());

        exercise(&UserSavedStore::new(db.clone(), "user-1")).await;

        let other = UserSavedStore::new(db, "user-2");
        assert!(other.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn local_store_persists_browser_shaped_state() {
        let dir = tempfile::tempdir().expect("create temporary directory");
        let path = dir.path().join("saved.json");
        let id = Uuid::new_v4();

        {
            let store = LocalSavedStore::load(&path).await.expect("load empty store");
            store.toggle_save(&id).await.unwrap();
            store.set_status(&id, SavedStatus::Completed).await.unwrap();
        }

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).expect("read saved state")).unwrap();

        assert_eq!(written["savedTutorials"][0], id.to_string());
        assert_eq!(written["tutorialStatuses"][id.to_string()], "completed");

        let reloaded = LocalSavedStore::load(&path).await.expect("reload store");
        assert_eq!(reloaded.snapshot().await.saved_tutorials, vec![id]);
    }

    #[tokio::test]
    async fn failed_writes_leave_the_state_unchanged() {
        let dir = tempfile::tempdir().expect("create temporary directory");
        let path = dir.path().join("missing").join("saved.json");
        let id = Uuid::new_v4();

        let store = LocalSavedStore::load(&path).await.expect("load empty store");

        assert!(matches!(store.toggle_save(&id).await, Err(BackendError::Io { .. })));
        assert_eq!(store.snapshot().await, LocalState::default());

        std::fs::create_dir(dir.path().join("missing")).expect("create state directory");

        assert!(store.toggle_save(&id).await.expect("toggle once writable"));
        assert_eq!(store.snapshot().await.saved_tutorials, vec![id]);

        std::fs::remove_file(&path).expect("remove state file");
        std::fs::remove_dir(dir.path().join("missing")).expect("remove state directory");

        assert!(store.set_status(&id, SavedStatus::Completed).await.is_err());
        assert!(store.remove(&id).await.is_err());
        assert_eq!(
            store.list().await.unwrap(),
            vec![SavedTutorial { tutorial_id: id, status: SavedStatus::Saved }]
        );
    }

    #[test]
    fn statuses_parse_from_their_wire_names() {
        assert_eq!("in-progress".parse::<SavedStatus>().unwrap(), SavedStatus::InProgress);
        assert!("done".parse::<SavedStatus>().is_err());
    }
}
