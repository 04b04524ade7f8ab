use std::time::{Duration, Instant};

use log::{debug, o};
use uuid::Uuid;
use warp::{
    http::StatusCode,
    reply::{json, with_header, with_status, Reply},
};

use crate::catalog::{self, Filter};
use crate::environment::Environment;
use crate::errors::BackendError;
use crate::moderation;
use crate::routes::{
    query::{BrowseQuery, FeaturedQuery, LanguagesQuery, StatusUpdate},
    rejection::{Context, Rejection},
    response::SuccessResponse,
};
use crate::submission::{SubmissionForm, Submitter};
use crate::tutorial::Tutorial;

const SERVER_TIMING_HEADER: &str = "server-timing";
type RouteResult = Result<Box<dyn Reply>, warp::Rejection>;

macro_rules! timed {
    ($($expression:stmt);+) => {
        let start = Instant::now();

        let result = { $($expression)+ };

        Ok(Box::new(with_header(
            result,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    };
}

pub async fn browse(environment: Environment, query: BrowseQuery) -> RouteResult {
    timed! {
        let category = String::from(query.category.clone());
        let error_handler = |e: BackendError| Rejection::new(Context::browse(category.clone()), e);

        debug!(environment.logger, "Browsing catalog..."; "category" => &category, "sort" => %query.sort);
        let records = load(&environment, &query.category).await.map_err(error_handler)?;

        let view = query.into_view(environment.config.page_size);

        json(&view.apply(records))
    }
}

pub async fn grouped(environment: Environment) -> RouteResult {
    timed! {
        let records = environment
            .catalog
            .fetch_all()
            .await
            .map_err(|e| Rejection::new(Context::grouped(), e))?;

        json(&catalog::group_by_category(records))
    }
}

pub async fn featured(environment: Environment, query: FeaturedQuery) -> RouteResult {
    timed! {
        let count = query.count.unwrap_or(environment.config.page_size);

        let records = environment
            .catalog
            .fetch_all()
            .await
            .map_err(|e| Rejection::new(Context::featured(), e))?;

        json(&catalog::featured(records, count))
    }
}

pub async fn languages(environment: Environment, query: LanguagesQuery) -> RouteResult {
    timed! {
        let error_handler =
            |e: BackendError| Rejection::new(Context::languages(String::from(query.category.clone())), e);

        let records = load(&environment, &query.category).await.map_err(error_handler)?;

        json(&catalog::available_languages(&records))
    }
}

pub async fn retrieve(environment: Environment, id: String) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::retrieve(id.clone()), e);

        let id = parse_id(&id).map_err(error_handler)?;
        debug!(environment.logger, "Retrieving tutorial..."; "id" => %id);

        let tutorial = environment
            .catalog
            .fetch_by_id(&id)
            .await
            .and_then(|t| t.ok_or(BackendError::NotFound(id)))
            .map_err(error_handler)?;

        json(&tutorial)
    }
}

pub async fn submit(
    environment: Environment,
    user: Option<String>,
    form: SubmissionForm,
) -> RouteResult {
    timed! {
        let submission = moderation::create_submission(
            &environment.logger,
            environment.submissions.as_ref(),
            form,
            Submitter::from(user),
        )
        .await
        .map_err(|e| Rejection::new(Context::submit(), e))?;

        with_status(
            json(&SuccessResponse::Submission { id: submission.id }),
            StatusCode::CREATED,
        )
    }
}

pub async fn submissions(environment: Environment, user: Option<String>) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::submissions(), e);

        require_admin(&environment, &user).map_err(error_handler)?;

        let submissions = environment
            .submissions
            .list()
            .await
            .map_err(error_handler)?;

        json(&submissions)
    }
}

pub async fn approve(environment: Environment, id: String, user: Option<String>) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::approve(id.clone()), e);

        require_admin(&environment, &user).map_err(error_handler)?;
        let id = parse_id(&id).map_err(error_handler)?;

        let logger = environment.logger.new(o!("submission" => id.to_string()));
        debug!(logger, "Approving submission...");

        let tutorial = moderation::approve(
            &logger,
            environment.catalog.as_ref(),
            environment.submissions.as_ref(),
            &id,
        )
        .await
        .map_err(error_handler)?;

        created(&environment, &tutorial)
    }
}

pub async fn reject(environment: Environment, id: String, user: Option<String>) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::reject(id.clone()), e);

        require_admin(&environment, &user).map_err(error_handler)?;
        let id = parse_id(&id).map_err(error_handler)?;

        moderation::reject(&environment.logger, environment.submissions.as_ref(), &id)
            .await
            .map_err(error_handler)?;

        StatusCode::NO_CONTENT
    }
}

pub async fn saved(environment: Environment, user: Option<String>) -> RouteResult {
    timed! {
        let store = environment.saved_store(user);

        let saved = store
            .list()
            .await
            .map_err(|e| Rejection::new(Context::saved(None), e))?;

        json(&saved)
    }
}

pub async fn toggle_saved(environment: Environment, id: String, user: Option<String>) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::saved(Some(id.clone())), e);

        let tutorial_id = parse_id(&id).map_err(error_handler)?;
        let store = environment.saved_store(user);

        let saved = store.toggle_save(&tutorial_id).await.map_err(error_handler)?;
        debug!(environment.logger, "Toggled saved tutorial"; "id" => %tutorial_id, "saved" => saved);

        json(&SuccessResponse::Toggle { tutorial_id, saved })
    }
}

pub async fn set_saved_status(
    environment: Environment,
    id: String,
    user: Option<String>,
    update: StatusUpdate,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::saved(Some(id.clone())), e);

        let tutorial_id = parse_id(&id).map_err(error_handler)?;
        let store = environment.saved_store(user);

        store
            .set_status(&tutorial_id, update.status)
            .await
            .map_err(error_handler)?;

        StatusCode::NO_CONTENT
    }
}

pub async fn remove_saved(environment: Environment, id: String, user: Option<String>) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::saved(Some(id.clone())), e);

        let tutorial_id = parse_id(&id).map_err(error_handler)?;
        let store = environment.saved_store(user);

        store.remove(&tutorial_id).await.map_err(error_handler)?;

        StatusCode::NO_CONTENT
    }
}

/// Loads the catalog, letting the source do the category filtering when
/// there is one.
async fn load(environment: &Environment, category: &Filter) -> Result<Vec<Tutorial>, BackendError> {
    match category {
        Filter::All => environment.catalog.fetch_all().await,
        Filter::Only(category) => environment.catalog.fetch_by_category(category).await,
    }
}

fn parse_id(id: &str) -> Result<Uuid, BackendError> {
    Uuid::parse_str(id).map_err(|_| BackendError::InvalidId(id.to_owned()))
}

fn require_admin(environment: &Environment, user: &Option<String>) -> Result<(), BackendError> {
    if environment.is_admin(user.as_deref()) {
        Ok(())
    } else {
        Err(BackendError::Forbidden)
    }
}

fn created(environment: &Environment, tutorial: &Tutorial) -> impl Reply {
    with_header(
        with_status(json(tutorial), StatusCode::CREATED),
        "location",
        environment.urls.tutorial(&tutorial.id).as_str(),
    )
}

fn format_server_timing(seconds: Duration) -> String {
    format!("handler;dur={}", seconds.as_secs_f64() * 1000.0)
}

