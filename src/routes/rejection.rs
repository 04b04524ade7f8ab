use serde::Serialize;
use warp::reject;

use crate::errors::{BackendError, FieldError};

#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: BackendError,
}

impl Rejection {
    pub fn new(context: Context, error: BackendError) -> Self {
        Rejection { context, error }
    }

    pub fn flatten(&self) -> FlattenedRejection {
        FlattenedRejection {
            context: self.context.clone(),
            message: format!("{}", self.error),
            errors: self.error.field_errors().map(<[FieldError]>::to_vec),
        }
    }
}

impl reject::Reject for Rejection {}

#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    #[serde(flatten)]
    pub(crate) context: Context,
    pub(crate) message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) errors: Option<Vec<FieldError>>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Context {
    Approve { id: String },
    Browse { category: String },
    Featured,
    Grouped,
    Languages { category: String },
    Reject { id: String },
    Retrieve { id: String },
    Saved { tutorial: Option<String> },
    Submissions,
    Submit,
}

impl Context {
    pub fn approve(id: String) -> Context {
        Context::Approve { id }
    }

    pub fn browse(category: String) -> Context {
        Context::Browse { category }
    }

    pub fn featured() -> Context {
        Context::Featured
    }

    pub fn grouped() -> Context {
        Context::Grouped
    }

    pub fn languages(category: String) -> Context {
        Context::Languages { category }
    }

    pub fn reject(id: String) -> Context {
        Context::Reject { id }
    }

    pub fn retrieve(id: String) -> Context {
        Context::Retrieve { id }
    }

    pub fn saved(tutorial: Option<String>) -> Context {
        Context::Saved { tutorial }
    }

    pub fn submissions() -> Context {
        Context::Submissions
    }

    pub fn submit() -> Context {
        Context::Submit
    }
}
