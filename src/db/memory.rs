use std::path::Path;

use futures::future::{BoxFuture, FutureExt};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::BackendError;
use crate::normalization::{compare_titles, RawTutorial};
use crate::saved::{SavedStatus, SavedTutorial};
use crate::submission::{NewSubmission, Submission, Submitter};
use crate::tutorial::{NewTutorial, Tutorial};

struct SavedRow {
    user: String,
    tutorial: SavedTutorial,
}

/// An in-process database, used for local runs and tests.
#[derive(Default)]
pub struct MemoryDb {
    tutorials: RwLock<Vec<Tutorial>>,
    submissions: RwLock<Vec<Submission>>,
    saved: RwLock<Vec<SavedRow>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tutorials(tutorials: Vec<Tutorial>) -> Self {
        MemoryDb {
            tutorials: RwLock::new(tutorials),
            ..Self::default()
        }
    }

    /// Seeds the catalog from a JSON array of loosely-shaped records.
    pub fn from_json(json: &[u8]) -> Result<Self, BackendError> {
        let raw: Vec<RawTutorial> =
            serde_json::from_slice(json).map_err(|source| BackendError::Json { source })?;

        Ok(Self::with_tutorials(
            raw.into_iter().map(RawTutorial::normalize).collect(),
        ))
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, BackendError> {
        let json = tokio::fs::read(path)
            .await
            .map_err(|source| BackendError::Io { source })?;

        Self::from_json(&json)
    }

    async fn published(&self, predicate: impl Fn(&Tutorial) -> bool) -> Vec<Tutorial> {
        let mut tutorials: Vec<Tutorial> = self
            .tutorials
            .read()
            .await
            .iter()
            .filter(|t| predicate(t))
            .cloned()
            .collect();

        tutorials.sort_by(|a, b| compare_titles(&a.title, &b.title));

        tutorials
    }
}

impl super::CatalogSource for MemoryDb {
    fn fetch_all(&self) -> BoxFuture<Result<Vec<Tutorial>, BackendError>> {
        async move { Ok(self.published(|_| true).await) }.boxed()
    }

    fn fetch_by_category(&self, category: &str) -> BoxFuture<Result<Vec<Tutorial>, BackendError>> {
        let category = category.to_owned();

        async move { Ok(self.published(|t| t.category == category).await) }.boxed()
    }

    fn fetch_by_id(&self, id: &Uuid) -> BoxFuture<Result<Option<Tutorial>, BackendError>> {
        let id = *id;

        async move {
            let tutorials = self.tutorials.read().await;

            Ok(tutorials.iter().find(|t| t.id == id).cloned())
        }
        .boxed()
    }

    fn create(&self, tutorial: NewTutorial) -> BoxFuture<Result<Tutorial, BackendError>> {
        async move {
            let tutorial = Tutorial::from_new(Uuid::new_v4(), tutorial);

            self.tutorials.write().await.push(tutorial.clone());

            Ok(tutorial)
        }
        .boxed()
    }

    fn delete(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
        let id = *id;

        async move {
            let mut tutorials = self.tutorials.write().await;
            let before = tutorials.len();

            tutorials.retain(|t| t.id != id);

            if tutorials.len() == before {
                Err(BackendError::NotFound(id))
            } else {
                Ok(())
            }
        }
        .boxed()
    }
}

impl super::SubmissionStore for MemoryDb {
    fn insert(
        &self,
        submission: NewSubmission,
        submitted_by: Submitter,
    ) -> BoxFuture<Result<Submission, BackendError>> {
        async move {
            let submission = Submission::new(
                Uuid::new_v4(),
                OffsetDateTime::now_utc(),
                submitted_by,
                submission.into(),
            );

            self.submissions.write().await.push(submission.clone());

            Ok(submission)
        }
        .boxed()
    }

    fn list(&self) -> BoxFuture<Result<Vec<Submission>, BackendError>> {
        async move { Ok(self.submissions.read().await.clone()) }.boxed()
    }

    fn find(&self, id: &Uuid) -> BoxFuture<Result<Option<Submission>, BackendError>> {
        let id = *id;

        async move {
            let submissions = self.submissions.read().await;

            Ok(submissions.iter().find(|s| s.id == id).cloned())
        }
        .boxed()
    }

    fn delete(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
        let id = *id;

        async move {
            let mut submissions = self.submissions.write().await;
            let before = submissions.len();

            submissions.retain(|s| s.id != id);

            if submissions.len() == before {
                Err(BackendError::NotFound(id))
            } else {
                Ok(())
            }
        }
        .boxed()
    }
}

impl super::SavedRecords for MemoryDb {
    fn list_saved(&self, user: &str) -> BoxFuture<Result<Vec<SavedTutorial>, BackendError>> {
        let user = user.to_owned();

        async move {
            let saved = self.saved.read().await;

            Ok(saved
                .iter()
                .filter(|row| row.user == user)
                .map(|row| row.tutorial.clone())
                .collect())
        }
        .boxed()
    }

    fn insert_saved(
        &self,
        user: &str,
        tutorial_id: &Uuid,
        status: SavedStatus,
    ) -> BoxFuture<Result<(), BackendError>> {
        let user = user.to_owned();
        let tutorial_id = *tutorial_id;

        async move {
            let mut saved = self.saved.write().await;

            let exists = saved
                .iter()
                .any(|row| row.user == user && row.tutorial.tutorial_id == tutorial_id);

            if !exists {
                saved.push(SavedRow {
                    user,
                    tutorial: SavedTutorial { tutorial_id, status },
                });
            }

            Ok(())
        }
        .boxed()
    }

    fn update_saved_status(
        &self,
        user: &str,
        tutorial_id: &Uuid,
        status: SavedStatus,
    ) -> BoxFuture<Result<bool, BackendError>> {
        let user = user.to_owned();
        let tutorial_id = *tutorial_id;

        async move {
            let mut saved = self.saved.write().await;

            let row = saved
                .iter_mut()
                .find(|row| row.user == user && row.tutorial.tutorial_id == tutorial_id);

            Ok(match row {
                Some(row) => {
                    row.tutorial.status = status;
                    true
                }
                None => false,
            })
        }
        .boxed()
    }

    fn delete_saved(&self, user: &str, tutorial_id: &Uuid) -> BoxFuture<Result<bool, BackendError>> {
        let user = user.to_owned();
        let tutorial_id = *tutorial_id;

        async move {
            let mut saved = self.saved.write().await;
            let before = saved.len();

            saved.retain(|row| !(row.user == user && row.tutorial.tutorial_id == tutorial_id));

            Ok(saved.len() < before)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CatalogSource;
    use crate::tutorial::Difficulty;

    const SEED: &str = r#"[
        {"title": "Zustand in depth", "category": "Frontend", "tags": ["React"]},
        {"title": "axum from scratch", "category": "Backend", "difficulty": "Advanced", "type": "video"},
        {"title": "Async Rust", "category": "Backend"}
    ]"#;

    #[tokio::test]
    async fn seeded_catalog_is_sorted_by_title() {
        let db = MemoryDb::from_json(SEED.as_bytes()).expect("seed catalog");

        let titles: Vec<_> = db
            .fetch_all()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();

        assert_eq!(titles, vec!["Async Rust", "axum from scratch", "Zustand in depth"]);

        let backend = db.fetch_by_category("Backend").await.unwrap();
        assert_eq!(backend.len(), 2);
        assert_eq!(backend[1].difficulty, Difficulty::Advanced);
    }

    #[tokio::test]
    async fn deleting_missing_tutorials_fails() {
        let db = MemoryDb::from_json(SEED.as_bytes()).expect("seed catalog");
        let first = db.fetch_all().await.unwrap().remove(0);

        assert_eq!(db.fetch_by_id(&first.id).await.unwrap(), Some(first.clone()));

        CatalogSource::delete(&db, &first.id).await.unwrap();

        assert_eq!(db.fetch_by_id(&first.id).await.unwrap(), None);
        assert!(matches!(
            CatalogSource::delete(&db, &first.id).await,
            Err(BackendError::NotFound(_))
        ));
    }

    #[test]
    fn malformed_seeds_are_rejected() {
        assert!(matches!(
            MemoryDb::from_json(b"{\"title\": 1}"),
            Err(BackendError::Json { .. })
        ));
    }
}
