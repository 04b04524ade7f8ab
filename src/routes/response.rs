use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SuccessResponse<'a> {
    Healthz {
        revision: Option<&'a str>,
        timestamp: Option<&'a str>,
        version: &'a str,
    },
    Submission {
        id: Uuid,
    },
    #[serde(rename_all = "camelCase")]
    Toggle {
        tutorial_id: Uuid,
        saved: bool,
    },
}
