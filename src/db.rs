use futures::future::BoxFuture;
use uuid::Uuid;

use crate::errors::BackendError;
use crate::saved::{SavedStatus, SavedTutorial};
use crate::submission::{NewSubmission, Submission, Submitter};
use crate::tutorial::{NewTutorial, Tutorial};

pub mod memory;

/// Where published tutorials come from. Reads only ever return published
/// records, ordered by title.
pub trait CatalogSource: Send + Sync {
    fn fetch_all(&self) -> BoxFuture<Result<Vec<Tutorial>, BackendError>>;

    fn fetch_by_category(&self, category: &str) -> BoxFuture<Result<Vec<Tutorial>, BackendError>>;

    fn fetch_by_id(&self, id: &Uuid) -> BoxFuture<Result<Option<Tutorial>, BackendError>>;

    fn create(&self, tutorial: NewTutorial) -> BoxFuture<Result<Tutorial, BackendError>>;

    fn delete(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>>;
}

/// Pending submissions awaiting moderation.
pub trait SubmissionStore: Send + Sync {
    fn insert(
        &self,
        submission: NewSubmission,
        submitted_by: Submitter,
    ) -> BoxFuture<Result<Submission, BackendError>>;

    /// Every pending submission, oldest first.
    fn list(&self) -> BoxFuture<Result<Vec<Submission>, BackendError>>;

    fn find(&self, id: &Uuid) -> BoxFuture<Result<Option<Submission>, BackendError>>;

    fn delete(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>>;
}

/// Per-user saved tutorial rows.
pub trait SavedRecords: Send + Sync {
    /// The user’s saved tutorials, in the order they were saved.
    fn list_saved(&self, user: &str) -> BoxFuture<Result<Vec<SavedTutorial>, BackendError>>;

    fn insert_saved(
        &self,
        user: &str,
        tutorial_id: &Uuid,
        status: SavedStatus,
    ) -> BoxFuture<Result<(), BackendError>>;

    /// Returns whether a row was updated.
    fn update_saved_status(
        &self,
        user: &str,
        tutorial_id: &Uuid,
        status: SavedStatus,
    ) -> BoxFuture<Result<bool, BackendError>>;

    /// Returns whether a row was deleted.
    fn delete_saved(&self, user: &str, tutorial_id: &Uuid) -> BoxFuture<Result<bool, BackendError>>;
}

pub use self::postgres::*;

mod postgres {
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sqlx::{
        self,
        postgres::{PgPool, PgRow},
    };
    use time::OffsetDateTime;
    use uuid::Uuid;

    use crate::errors::{map_read_error, map_write_error, BackendError};
    use crate::saved::{SavedStatus, SavedTutorial};
    use crate::submission::{NewSubmission, Submission, SubmissionDetails, Submitter};
    use crate::tutorial::{Difficulty, NewTutorial, Tutorial, TutorialType};

    pub struct PgDb {
        pool: PgPool,
    }

    impl PgDb {
        pub fn new(pool: PgPool) -> Self {
            PgDb { pool }
        }
    }

    // these can be simplified once async functions in traits are stabilized
    impl super::CatalogSource for PgDb {
        fn fetch_all(&self) -> BoxFuture<Result<Vec<Tutorial>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/fetch_tutorials.sql"));

                let tutorials = query
                    .try_map(|row: PgRow| tutorial_from_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_read_error)?;

                Ok(tutorials)
            }
            .boxed()
        }

        fn fetch_by_category(&self, category: &str) -> BoxFuture<Result<Vec<Tutorial>, BackendError>> {
            let category = category.to_owned();

            async move {
                let query = sqlx::query(include_str!("queries/fetch_tutorials_by_category.sql"));

                let tutorials = query
                    .bind(category)
                    .try_map(|row: PgRow| tutorial_from_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_read_error)?;

                Ok(tutorials)
            }
            .boxed()
        }

        fn fetch_by_id(&self, id: &Uuid) -> BoxFuture<Result<Option<Tutorial>, BackendError>> {
            let id = *id;

            async move {
                let query = sqlx::query(include_str!("queries/fetch_tutorial.sql"));

                let tutorial = query
                    .bind(id)
                    .try_map(|row: PgRow| tutorial_from_row(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_read_error)?;

                Ok(tutorial)
            }
            .boxed()
        }

        fn create(&self, tutorial: NewTutorial) -> BoxFuture<Result<Tutorial, BackendError>> {
            async move {
                let query = sqlx::query_as(include_str!("queries/create_tutorial.sql"));

                let (id,): (Uuid,) = query
                    .bind(&tutorial.title)
                    .bind(&tutorial.url)
                    .bind(&tutorial.image_url)
                    .bind(tutorial.kind.as_str())
                    .bind(&tutorial.summary)
                    .bind(&tutorial.tags)
                    .bind(tutorial.difficulty.as_str())
                    .bind(&tutorial.language)
                    .bind(&tutorial.category)
                    .bind(&tutorial.estimated_time)
                    .bind(tutorial.status.as_str())
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_write_error)?;

                Ok(Tutorial::from_new(id, tutorial))
            }
            .boxed()
        }

        fn delete(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
            let id = *id;

            async move {
                let query = sqlx::query(include_str!("queries/delete_tutorial.sql"));

                delete_by_id(query, id, &self.pool).await
            }
            .boxed()
        }
    }

    impl super::SubmissionStore for PgDb {
        fn insert(
            &self,
            submission: NewSubmission,
            submitted_by: Submitter,
        ) -> BoxFuture<Result<Submission, BackendError>> {
            async move {
                let query = sqlx::query_as(include_str!("queries/create_submission.sql"));

                let (id, submitted_at): (Uuid, OffsetDateTime) = query
                    .bind(&submission.url)
                    .bind(&submission.title)
                    .bind(&submission.summary)
                    .bind(&submission.language)
                    .bind(&submission.category)
                    .bind(submission.difficulty.as_str())
                    .bind(submission.duration)
                    .bind(&submission.tags)
                    .bind(&submission.tools)
                    .bind(&submission.contributor_name)
                    .bind(&submission.contributor_email)
                    .bind(submitted_by.to_string())
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_write_error)?;

                Ok(Submission::new(id, submitted_at, submitted_by, submission.into()))
            }
            .boxed()
        }

        fn list(&self) -> BoxFuture<Result<Vec<Submission>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_submissions.sql"));

                let submissions = query
                    .try_map(|row: PgRow| submission_from_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_read_error)?;

                Ok(submissions)
            }
            .boxed()
        }

        fn find(&self, id: &Uuid) -> BoxFuture<Result<Option<Submission>, BackendError>> {
            let id = *id;

            async move {
                let query = sqlx::query(include_str!("queries/retrieve_submission.sql"));

                let submission = query
                    .bind(id)
                    .try_map(|row: PgRow| submission_from_row(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_read_error)?;

                Ok(submission)
            }
            .boxed()
        }

        fn delete(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
            let id = *id;

            async move {
                let query = sqlx::query(include_str!("queries/delete_submission.sql"));

                delete_by_id(query, id, &self.pool).await
            }
            .boxed()
        }
    }

    impl super::SavedRecords for PgDb {
        fn list_saved(&self, user: &str) -> BoxFuture<Result<Vec<SavedTutorial>, BackendError>> {
            let user = user.to_owned();

            async move {
                let query = sqlx::query(include_str!("queries/retrieve_saved.sql"));

                let saved = query
                    .bind(user)
                    .try_map(|row: PgRow| {
                        let tutorial_id: Uuid = try_get(&row, "tutorial_id")?;
                        let status: String = try_get(&row, "status")?;
                        let status = status
                            .parse::<SavedStatus>()
                            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

                        Ok(SavedTutorial { tutorial_id, status })
                    })
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_read_error)?;

                Ok(saved)
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
                let query = sqlx::query(include_str!("queries/create_saved.sql"));

                let _ = query
                    .bind(user)
                    .bind(tutorial_id)
                    .bind(status.as_str())
                    .execute(&self.pool)
                    .await
                    .map_err(map_write_error)?;

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
                let query = sqlx::query(include_str!("queries/update_saved_status.sql"));

                let count = query
                    .bind(user)
                    .bind(tutorial_id)
                    .bind(status.as_str())
                    .execute(&self.pool)
                    .await
                    .map_err(map_write_error)?
                    .rows_affected();

                Ok(count > 0)
            }
            .boxed()
        }

        fn delete_saved(&self, user: &str, tutorial_id: &Uuid) -> BoxFuture<Result<bool, BackendError>> {
            let user = user.to_owned();
            let tutorial_id = *tutorial_id;

            async move {
                let query = sqlx::query(include_str!("queries/delete_saved.sql"));

                let count = query
                    .bind(user)
                    .bind(tutorial_id)
                    .execute(&self.pool)
                    .await
                    .map_err(map_write_error)?
                    .rows_affected();

                Ok(count > 0)
            }
            .boxed()
        }
    }

    async fn delete_by_id(
        query: sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>,
        id: Uuid,
        pool: &PgPool,
    ) -> Result<(), BackendError> {
        let count = query
            .bind(id)
            .execute(pool)
            .await
            .map_err(map_write_error)?
            .rows_affected();

        if count == 0 {
            Err(BackendError::NotFound(id))
        } else {
            Ok(())
        }
    }

    fn tutorial_from_row(row: &PgRow) -> Result<Tutorial, sqlx::Error> {
        let kind: String = try_get(row, "kind")?;
        let kind: TutorialType = kind
            .parse()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let difficulty: String = try_get(row, "difficulty")?;

        Ok(Tutorial {
            id: try_get(row, "id")?,
            title: try_get(row, "title")?,
            url: try_get(row, "url")?,
            image_url: try_get(row, "image_url")?,
            kind,
            summary: try_get(row, "summary")?,
            tags: try_get(row, "tags")?,
            difficulty: Difficulty::from(difficulty),
            language: try_get(row, "language")?,
            category: try_get(row, "category")?,
            estimated_time: try_get(row, "estimated_time")?,
        })
    }

    fn submission_from_row(row: &PgRow) -> Result<Submission, sqlx::Error> {
        let difficulty: String = try_get(row, "difficulty")?;
        let submitted_by: String = try_get(row, "submitted_by")?;

        let details = SubmissionDetails {
            url: try_get(row, "url")?,
            title: try_get(row, "title")?,
            summary: try_get(row, "summary")?,
            language: try_get(row, "language")?,
            category: try_get(row, "category")?,
            difficulty: Difficulty::from(difficulty),
            duration: try_get(row, "duration")?,
            tags: try_get(row, "tags")?,
            tools: try_get(row, "tools")?,
            contributor_name: try_get(row, "contributor_name")?,
            contributor_email: try_get(row, "contributor_email")?,
        };

        Ok(Submission::new(
            try_get(row, "id")?,
            try_get(row, "submitted_at")?,
            Submitter::from(submitted_by),
            details,
        ))
    }

    fn try_get<'a, T: sqlx::Type<sqlx::Postgres> + sqlx::decode::Decode<'a, sqlx::Postgres>>(
        row: &'a PgRow,
        column: &str,
    ) -> Result<T, sqlx::Error> {
        use sqlx::prelude::*;

        row.try_get(column)
    }
}
