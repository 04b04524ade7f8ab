use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;
use uuid::Uuid;

use crate::errors::{BackendError, ValidationErrors};
use crate::normalization::{self, parse_tags};
use crate::tutorial::{Difficulty, NewTutorial, PublicationStatus, TutorialType};

/// Languages a submission may be filed under.
pub const LANGUAGES: &[&str] = &["JavaScript", "Python", "Dart", "TypeScript", "Java", "Go"];

/// Categories a submission may be filed under.
pub const CATEGORIES: &[&str] = &["Frontend", "Backend", "Full Stack", "Mobile", "AI/ML"];

const ANONYMOUS: &str = "anonymous";

lazy_static! {
    static ref YOUTUBE_URL: Regex =
        Regex::new(r"^(https?://)?(www\.)?(youtube\.com|youtu\.?be)/.+$").expect("compile YouTube URL pattern");
    static ref EMAIL: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("compile email pattern");
}

/// The submission form as sent by a contributor.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SubmissionForm {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub summary: String,

    #[serde(default, deserialize_with = "normalization::deserialize")]
    pub language: String,

    #[serde(default, deserialize_with = "normalization::deserialize")]
    pub category: String,

    #[serde(default)]
    pub difficulty: String,

    /// Forms send this as text, API clients as a number.
    #[serde(default)]
    pub duration: Option<Duration>,

    /// A comma-separated tag list.
    #[serde(default)]
    pub tags: Option<String>,

    #[serde(default, deserialize_with = "normalization::deserialize_option")]
    pub tools: Option<String>,

    #[serde(default, deserialize_with = "normalization::deserialize_option")]
    pub contributor_name: Option<String>,

    #[serde(default)]
    pub contributor_email: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Duration {
    Number(f64),
    Text(String),
}

impl Duration {
    fn value(&self) -> Option<f64> {
        match self {
            Duration::Number(n) => Some(*n),
            // an empty field counts as zero, like a numeric form input
            Duration::Text(s) if s.trim().is_empty() => Some(0.0),
            Duration::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl SubmissionForm {
    /// Checks every field, collecting all failures rather than stopping at
    /// the first one.
    pub fn validate(self) -> Result<NewSubmission, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let url_is_valid = Url::parse(&self.url).is_ok() && YOUTUBE_URL.is_match(&self.url);
        if !url_is_valid {
            errors.add("url", "Please enter a valid YouTube URL.");
        }

        if self.title.trim().chars().count() < 5 {
            errors.add("title", "Title must be at least 5 characters long.");
        }

        if self.summary.trim().chars().count() < 20 {
            errors.add("summary", "Summary must be at least 20 characters long.");
        }

        if !LANGUAGES.contains(&self.language.as_str()) {
            errors.add("language", "Please select a language.");
        }

        if !CATEGORIES.contains(&self.category.as_str()) {
            errors.add("category", "Please select a category.");
        }

        let difficulty = Difficulty::from(self.difficulty.as_str());
        if !difficulty.is_known() {
            errors.add("difficulty", "Please select a difficulty level.");
        }

        let duration = self
            .duration
            .as_ref()
            .and_then(Duration::value)
            .filter(|d| d.is_finite() && *d >= 0.0);
        if duration.is_none() {
            errors.add("duration", "Duration must be a positive number.");
        }

        let contributor_email = self
            .contributor_email
            .map(|e| e.trim().to_owned())
            .filter(|e| !e.is_empty());
        if let Some(email) = &contributor_email {
            if !EMAIL.is_match(email) {
                errors.add("contributorEmail", "Please enter a valid email.");
            }
        }

        let submission = NewSubmission {
            url: self.url.trim().to_owned(),
            title: self.title.trim().to_owned(),
            summary: self.summary.trim().to_owned(),
            language: self.language,
            category: self.category,
            difficulty,
            duration: duration.unwrap_or_default(),
            tags: self.tags.filter(|t| !t.trim().is_empty()),
            tools: self.tools.filter(|t| !t.is_empty()),
            contributor_name: self.contributor_name.filter(|n| !n.is_empty()),
            contributor_email,
        };

        errors.into_result(submission)
    }
}

/// A validated submission, ready to be stored as pending.
#[derive(Clone, Debug, PartialEq)]
pub struct NewSubmission {
    pub url: String,
    pub title: String,
    pub summary: String,
    pub language: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub duration: f64,
    pub tags: Option<String>,
    pub tools: Option<String>,
    pub contributor_name: Option<String>,
    pub contributor_email: Option<String>,
}

/// Who sent a submission.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(into = "String")]
pub enum Submitter {
    User(String),
    Anonymous,
}

impl From<Option<String>> for Submitter {
    fn from(user: Option<String>) -> Self {
        match user {
            Some(id) if !id.is_empty() => Submitter::User(id),
            _ => Submitter::Anonymous,
        }
    }
}

impl From<String> for Submitter {
    fn from(stored: String) -> Self {
        if stored == ANONYMOUS {
            Submitter::Anonymous
        } else {
            Submitter::from(Some(stored))
        }
    }
}

impl From<Submitter> for String {
    fn from(submitter: Submitter) -> Self {
        match submitter {
            Submitter::User(id) => id,
            Submitter::Anonymous => ANONYMOUS.to_owned(),
        }
    }
}

impl fmt::Display for Submitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Submitter::User(id) => f.write_str(id),
            Submitter::Anonymous => f.write_str(ANONYMOUS),
        }
    }
}

/// A pending submission as stored. Submissions are never updated; they
/// are only ever created and then deleted.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,

    #[serde(flatten)]
    pub details: SubmissionDetails,

    #[serde(with = "time::serde::timestamp")]
    pub submitted_at: OffsetDateTime,

    pub submitted_by: Submitter,

    pub status: SubmissionState,
}

/// The contributor-provided part of a stored submission.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionDetails {
    pub url: String,
    pub title: String,
    pub summary: String,
    pub language: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributor_email: Option<String>,
}

impl From<NewSubmission> for SubmissionDetails {
    fn from(new: NewSubmission) -> Self {
        SubmissionDetails {
            url: new.url,
            title: new.title,
            summary: new.summary,
            language: new.language,
            category: new.category,
            difficulty: new.difficulty,
            duration: new.duration,
            tags: new.tags,
            tools: new.tools,
            contributor_name: new.contributor_name,
            contributor_email: new.contributor_email,
        }
    }
}

impl Submission {
    pub fn new(
        id: Uuid,
        submitted_at: OffsetDateTime,
        submitted_by: Submitter,
        details: SubmissionDetails,
    ) -> Self {
        Submission {
            id,
            details,
            submitted_at,
            submitted_by,
            status: SubmissionState::Pending,
        }
    }

    /// The approval view of this submission.
    pub fn approval_request(&self) -> ApprovalRequest {
        let details = &self.details;

        ApprovalRequest {
            id: self.id,
            url: details.url.clone(),
            title: details.title.clone(),
            summary: details.summary.clone(),
            language: details.language.clone(),
            category: details.category.clone(),
            difficulty: details.difficulty.as_str().to_owned(),
            duration: format_duration(details.duration),
            tags: details.tags.clone(),
        }
    }
}

fn format_duration(duration: f64) -> String {
    format!("{}", duration)
}

/// What an approval needs to know about a submission.
#[derive(Clone, Debug, PartialEq)]
pub struct ApprovalRequest {
    pub id: Uuid,
    pub url: String,
    pub title: String,
    pub summary: String,
    pub language: String,
    pub category: String,
    pub difficulty: String,
    pub duration: String,
    pub tags: Option<String>,
}

impl ApprovalRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if Url::parse(&self.url).is_err() {
            errors.add("url", "Please enter a valid URL.");
        }

        let required = [
            ("title", &self.title, "Title is required."),
            ("summary", &self.summary, "Summary is required."),
            ("language", &self.language, "Language is required."),
            ("category", &self.category, "Category is required."),
            ("difficulty", &self.difficulty, "Difficulty is required."),
            ("duration", &self.duration, "Duration is required."),
        ];

        for &(field, value, message) in required.iter() {
            if value.trim().is_empty() {
                errors.add(field, message);
            }
        }

        errors.into_result(())
    }

    /// The published catalog record this approval creates. Approved
    /// submissions are always videos.
    pub fn to_tutorial(&self) -> NewTutorial {
        NewTutorial {
            title: self.title.clone(),
            url: self.url.clone(),
            image_url: None,
            kind: TutorialType::Video,
            summary: self.summary.clone(),
            tags: self.tags.as_deref().map(parse_tags).unwrap_or_default(),
            difficulty: Difficulty::from(self.difficulty.as_str()),
            language: self.language.clone(),
            category: self.category.clone(),
            estimated_time: self.duration.clone(),
            status: PublicationStatus::Published,
        }
    }
}

/// The moderation state of a submission.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionState {
    Pending,
    Published,
    Deleted,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision {
    Approve,
    Reject,
}

impl SubmissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionState::Pending => "pending",
            SubmissionState::Published => "published",
            SubmissionState::Deleted => "deleted",
        }
    }

    /// Applies a moderation decision. Only pending submissions can be
    /// decided.
    pub fn decide(self, decision: Decision) -> Result<SubmissionState, BackendError> {
        match (self, decision) {
            (SubmissionState::Pending, Decision::Approve) => Ok(SubmissionState::Published),
            (SubmissionState::Pending, Decision::Reject) => Ok(SubmissionState::Deleted),
            (terminal, _) => Err(BackendError::InvalidTransition(terminal.as_str())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> SubmissionForm {
        SubmissionForm {
            url: "https://youtube.com/watch?v=abc".to_owned(),
            title: "Build X with React".to_owned(),
            summary: "A full walkthrough of building X from scratch.".to_owned(),
            language: "JavaScript".to_owned(),
            category: "Frontend".to_owned(),
            difficulty: "Beginner".to_owned(),
            duration: Some(Duration::Text("2".to_owned())),
            tags: Some("react, hooks".to_owned()),
            ..SubmissionForm::default()
        }
    }

    #[test]
    fn valid_forms_pass() {
        let submission = valid_form().validate().expect("validate form");

        assert_eq!(submission.duration, 2.0);
        assert_eq!(submission.difficulty, Difficulty::Beginner);
        assert_eq!(submission.contributor_email, None);
    }

    #[test]
    fn every_failing_field_is_reported() {
        let form = SubmissionForm {
            url: "https://vimeo.com/123".to_owned(),
            title: "Hey".to_owned(),
            summary: "Too short".to_owned(),
            language: "COBOL".to_owned(),
            category: String::new(),
            difficulty: "Expert".to_owned(),
            duration: Some(Duration::Number(-1.0)),
            contributor_email: Some("not-an-email".to_owned()),
            ..SubmissionForm::default()
        };

        let errors = form.validate().expect_err("form must fail");

        assert_eq!(
            errors.fields(),
            vec!["url", "title", "summary", "language", "category", "difficulty", "duration", "contributorEmail"]
        );
    }

    #[test]
    fn youtube_short_links_and_blank_emails_are_accepted() {
        let form = SubmissionForm {
            url: "https://youtu.be/abc".to_owned(),
            contributor_email: Some(String::new()),
            ..valid_form()
        };

        assert!(form.validate().is_ok());
    }

    #[test]
    fn form_json_is_camel_case_and_strict() {
        let form: SubmissionForm = serde_json::from_str(
            r#"{"url": "https://www.youtube.com/watch?v=abc", "title": "Build X", "duration": 1.5, "contributorEmail": "a@b.co"}"#,
        )
        .expect("parse form");

        assert_eq!(form.duration, Some(Duration::Number(1.5)));
        assert_eq!(form.contributor_email.as_deref(), Some("a@b.co"));

        let unknown = serde_json::from_str::<SubmissionForm>(r#"{"title": "x", "isAdmin": true}"#);
        assert!(unknown.is_err());
    }

    #[test]
    fn approval_maps_to_a_published_video() {
        let request = ApprovalRequest {
            id: Uuid::new_v4(),
            url: "https://youtube.com/watch?v=abc".to_owned(),
            title: "Build X".to_owned(),
            summary: "...".to_owned(),
            language: "JavaScript".to_owned(),
            category: "Frontend".to_owned(),
            difficulty: "Beginner".to_owned(),
            duration: "2".to_owned(),
            tags: Some("react, hooks".to_owned()),
        };

        assert!(request.validate().is_ok());

        let tutorial = request.to_tutorial();

        assert_eq!(tutorial.tags, vec!["react", "hooks"]);
        assert_eq!(tutorial.kind, TutorialType::Video);
        assert_eq!(tutorial.status, PublicationStatus::Published);
        assert_eq!(tutorial.estimated_time, "2");
    }

    #[test]
    fn approval_requires_a_url() {
        let request = ApprovalRequest {
            id: Uuid::new_v4(),
            url: "youtube".to_owned(),
            title: "Build X".to_owned(),
            summary: "...".to_owned(),
            language: "JavaScript".to_owned(),
            category: "Frontend".to_owned(),
            difficulty: "Beginner".to_owned(),
            duration: String::new(),
            tags: None,
        };

        let errors = request.validate().expect_err("request must fail");

        assert_eq!(errors.fields(), vec!["url", "duration"]);
        assert!(request.to_tutorial().tags.is_empty());
    }

    #[test]
    fn stored_submissions_render_their_duration_as_text() {
        let details = SubmissionDetails::from(valid_form().validate().unwrap());
        let submission = Submission::new(
            Uuid::new_v4(),
            OffsetDateTime::now_utc(),
            Submitter::from(None),
            details,
        );

        let request = submission.approval_request();

        assert_eq!(request.duration, "2");
        assert_eq!(request.id, submission.id);
        assert_eq!(String::from(submission.submitted_by), "anonymous");
    }

    #[test]
    fn decisions_only_apply_to_pending_submissions() {
        let published = SubmissionState::Pending.decide(Decision::Approve).unwrap();
        assert_eq!(published, SubmissionState::Published);

        let deleted = SubmissionState::Pending.decide(Decision::Reject).unwrap();
        assert_eq!(deleted, SubmissionState::Deleted);

        assert!(published.decide(Decision::Reject).is_err());
        assert!(deleted.decide(Decision::Approve).is_err());
    }
}
