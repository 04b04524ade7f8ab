//! Moving submissions through moderation.
//!
//! Approval is a two-step write across two stores with no transaction
//! around it: the catalog record is created first, then the pending
//! submission is deleted. A failure in the first step leaves the
//! submission untouched; a failure in the second is reported as
//! [`BackendError::PartialApproval`] and left for manual cleanup.

use log::{debug, error, o, Logger};
use uuid::Uuid;

use crate::db::{CatalogSource, SubmissionStore};
use crate::errors::BackendError;
use crate::submission::{Decision, Submission, SubmissionForm, Submitter};
use crate::tutorial::Tutorial;

/// Validates the form and stores it as a pending submission.
pub async fn create_submission(
    logger: &Logger,
    submissions: &dyn SubmissionStore,
    form: SubmissionForm,
    submitted_by: Submitter,
) -> Result<Submission, BackendError> {
    let new = form.validate()?;

    let submission = submissions.insert(new, submitted_by).await?;

    debug!(logger, "Stored submission"; "id" => %submission.id, "submitted_by" => %submission.submitted_by);

    Ok(submission)
}

/// Publishes the pending submission `id` and removes it from the queue.
/// The stored submission must still be pending; nothing is written
/// otherwise.
pub async fn approve(
    logger: &Logger,
    catalog: &dyn CatalogSource,
    submissions: &dyn SubmissionStore,
    id: &Uuid,
) -> Result<Tutorial, BackendError> {
    let logger = logger.new(o!("submission" => id.to_string()));

    let submission = pending(submissions, id).await?;
    let state = submission.status.decide(Decision::Approve)?;

    let request = submission.approval_request();
    request.validate()?;

    let tutorial = catalog.create(request.to_tutorial()).await?;
    debug!(logger, "Published tutorial"; "tutorial" => %tutorial.id);

    if let Err(e) = submissions.delete(id).await {
        error!(logger, "Failed to remove approved submission"; "tutorial" => %tutorial.id, "error" => %e);

        return Err(BackendError::PartialApproval {
            tutorial: tutorial.id,
            submission: *id,
            source: Box::new(e),
        });
    }

    debug!(logger, "Moderated submission"; "state" => state.as_str());

    Ok(tutorial)
}

/// Deletes a pending submission without publishing anything.
pub async fn reject(
    logger: &Logger,
    submissions: &dyn SubmissionStore,
    id: &Uuid,
) -> Result<(), BackendError> {
    let submission = pending(submissions, id).await?;
    let state = submission.status.decide(Decision::Reject)?;

    submissions.delete(id).await?;

    debug!(logger, "Moderated submission"; "id" => %id, "state" => state.as_str());

    Ok(())
}

async fn pending(submissions: &dyn SubmissionStore, id: &Uuid) -> Result<Submission, BackendError> {
    submissions
        .find(id)
        .await?
        .ok_or(BackendError::NotFound(*id))
}

#[cfg(test)]
mod tests {
    use futures::future::{BoxFuture, FutureExt};
    use time::OffsetDateTime;

    use super::*;
    use crate::db::memory::MemoryDb;
    use crate::submission::{Duration, NewSubmission, SubmissionDetails, SubmissionState};
    use crate::tutorial::{NewTutorial, TutorialType};

    fn form() -> SubmissionForm {
        SubmissionForm {
            url: "https://youtube.com/watch?v=abc".to_owned(),
            title: "Build X".to_owned(),
            summary: "Everything you need to build X.".to_owned(),
            language: "JavaScript".to_owned(),
            category: "Frontend".to_owned(),
            difficulty: "Beginner".to_owned(),
            duration: Some(Duration::Number(2.0)),
            tags: Some("react, hooks".to_owned()),
            ..SubmissionForm::default()
        }
    }

    fn stored(status: SubmissionState) -> Submission {
        let details = SubmissionDetails::from(form().validate().expect("validate form"));
        let mut submission =
            Submission::new(Uuid::new_v4(), OffsetDateTime::now_utc(), Submitter::Anonymous, details);
        submission.status = status;

        submission
    }

    #[tokio::test]
    async fn approval_publishes_and_removes_the_submission() {
        let logger = log::discard_logger();
        let db = MemoryDb::new();

        let submission = create_submission(&logger, &db, form(), Submitter::Anonymous)
            .await
            .expect("create submission");

        let tutorial = approve(&logger, &db, &db, &submission.id)
            .await
            .expect("approve submission");

        assert_eq!(tutorial.tags, vec!["react", "hooks"]);
        assert_eq!(tutorial.kind, TutorialType::Video);
        assert_eq!(db.fetch_by_id(&tutorial.id).await.unwrap(), Some(tutorial));
        assert_eq!(db.find(&submission.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn approving_twice_publishes_once() {
        let logger = log::discard_logger();
        let db = MemoryDb::new();

        let submission = create_submission(&logger, &db, form(), Submitter::Anonymous)
            .await
            .unwrap();

        approve(&logger, &db, &db, &submission.id).await.expect("approve submission");

        assert!(matches!(
            approve(&logger, &db, &db, &submission.id).await,
            Err(BackendError::NotFound(id)) if id == submission.id
        ));
        assert_eq!(db.fetch_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_forms_are_not_stored() {
        let logger = log::discard_logger();
        let db = MemoryDb::new();

        let result = create_submission(
            &logger,
            &db,
            SubmissionForm { title: "X".to_owned(), ..form() },
            Submitter::User("u1".to_owned()),
        )
        .await;

        assert_eq!(result.unwrap_err().field_errors().map(|e| e.len()), Some(1));
        assert!(db.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejecting_a_missing_submission_fails() {
        let logger = log::discard_logger();
        let db = MemoryDb::new();

        let submission = create_submission(&logger, &db, form(), Submitter::Anonymous)
            .await
            .unwrap();

        reject(&logger, &db, &submission.id).await.expect("reject submission");

        assert!(db.fetch_all().await.unwrap().is_empty());
        assert!(matches!(
            reject(&logger, &db, &submission.id).await,
            Err(BackendError::NotFound(_))
        ));
    }

    /// Holds exactly one stored submission and counts deletions.
    struct OneSubmission {
        submission: Submission,
        deletions: std::sync::atomic::AtomicUsize,
    }

    impl OneSubmission {
        fn new(submission: Submission) -> Self {
            OneSubmission {
                submission,
                deletions: Default::default(),
            }
        }

        fn deletions(&self) -> usize {
            self.deletions.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    impl SubmissionStore for OneSubmission {
        fn insert(&self, _s: NewSubmission, _by: Submitter) -> BoxFuture<Result<Submission, BackendError>> {
            let submission = self.submission.clone();
            async move { Ok(submission) }.boxed()
        }

        fn list(&self) -> BoxFuture<Result<Vec<Submission>, BackendError>> {
            let submission = self.submission.clone();
            async move { Ok(vec![submission]) }.boxed()
        }

        fn find(&self, id: &Uuid) -> BoxFuture<Result<Option<Submission>, BackendError>> {
            let found = Some(self.submission.clone()).filter(|s| s.id == *id);
            async move { Ok(found) }.boxed()
        }

        fn delete(&self, _id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
            self.deletions.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async move { Ok(()) }.boxed()
        }
    }

    #[tokio::test]
    async fn decided_submissions_cannot_be_decided_again() {
        let logger = log::discard_logger();
        let catalog = MemoryDb::new();

        for &status in [SubmissionState::Published, SubmissionState::Deleted].iter() {
            let submissions = OneSubmission::new(stored(status));
            let id = submissions.submission.id;

            assert!(matches!(
                approve(&logger, &catalog, &submissions, &id).await,
                Err(BackendError::InvalidTransition(s)) if s == status.as_str()
            ));
            assert!(matches!(
                reject(&logger, &submissions, &id).await,
                Err(BackendError::InvalidTransition(_))
            ));
            assert_eq!(submissions.deletions(), 0);
        }

        assert!(catalog.fetch_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_approvals_publish_nothing() {
        let logger = log::discard_logger();
        let catalog = MemoryDb::new();

        let mut submission = stored(SubmissionState::Pending);
        submission.details.url = "not a url".to_owned();
        let submissions = OneSubmission::new(submission);

        assert!(matches!(
            approve(&logger, &catalog, &submissions, &submissions.submission.id).await,
            Err(BackendError::Validation(_))
        ));
        assert!(catalog.fetch_all().await.unwrap().is_empty());
        assert_eq!(submissions.deletions(), 0);
    }

    /// A catalog that cannot be written to.
    struct ReadOnlyCatalog;

    impl CatalogSource for ReadOnlyCatalog {
        fn fetch_all(&self) -> BoxFuture<Result<Vec<Tutorial>, BackendError>> {
            async move { Ok(vec![]) }.boxed()
        }

        fn fetch_by_category(&self, _category: &str) -> BoxFuture<Result<Vec<Tutorial>, BackendError>> {
            async move { Ok(vec![]) }.boxed()
        }

        fn fetch_by_id(&self, _id: &Uuid) -> BoxFuture<Result<Option<Tutorial>, BackendError>> {
            async move { Ok(None) }.boxed()
        }

        fn create(&self, _tutorial: NewTutorial) -> BoxFuture<Result<Tutorial, BackendError>> {
            async move {
                Err(BackendError::Network {
                    source: sqlx::Error::PoolTimedOut,
                })
            }
            .boxed()
        }

        fn delete(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
            let id = *id;
            async move { Err(BackendError::NotFound(id)) }.boxed()
        }
    }

    #[tokio::test]
    async fn failed_publication_keeps_the_submission() {
        let logger = log::discard_logger();
        let db = MemoryDb::new();

        let submission = create_submission(&logger, &db, form(), Submitter::Anonymous)
            .await
            .unwrap();

        assert!(matches!(
            approve(&logger, &ReadOnlyCatalog, &db, &submission.id).await,
            Err(BackendError::Network { .. })
        ));
        assert_eq!(db.find(&submission.id).await.unwrap(), Some(submission.clone()));

        approve(&logger, &db, &db, &submission.id)
            .await
            .expect("retry approval");
        assert_eq!(db.fetch_all().await.unwrap().len(), 1);
    }

    /// Accepts submissions but fails every deletion.
    struct StuckSubmissions(MemoryDb);

    impl SubmissionStore for StuckSubmissions {
        fn insert(&self, s: NewSubmission, by: Submitter) -> BoxFuture<Result<Submission, BackendError>> {
            self.0.insert(s, by)
        }

        fn list(&self) -> BoxFuture<Result<Vec<Submission>, BackendError>> {
            self.0.list()
        }

        fn find(&self, id: &Uuid) -> BoxFuture<Result<Option<Submission>, BackendError>> {
            self.0.find(id)
        }

        fn delete(&self, _id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
            async move {
                Err(BackendError::Network {
                    source: sqlx::Error::PoolClosed,
                })
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn failed_cleanup_is_a_partial_approval() {
        let logger = log::discard_logger();
        let catalog = MemoryDb::new();
        let submissions = StuckSubmissions(MemoryDb::new());

        let submission = create_submission(&logger, &submissions, form(), Submitter::Anonymous)
            .await
            .unwrap();

        let result = approve(&logger, &catalog, &submissions, &submission.id).await;

        match result {
            Err(BackendError::PartialApproval { tutorial, submission: id, .. }) => {
                assert_eq!(id, submission.id);

                let published = catalog.fetch_by_id(&tutorial).await.unwrap().expect("published tutorial");
                assert_eq!(published.title, "Build X");
            }
            other => panic!("expected a partial approval, got {:?}", other),
        }

        assert_eq!(submissions.list().await.unwrap().len(), 1);
    }
}
