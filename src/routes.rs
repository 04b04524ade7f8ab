use std::sync::Arc;

use log::{error, Logger};
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_status, Json, WithStatus};

use crate::errors::BackendError;

pub mod admin;
mod handlers;
mod query;
mod rejection;
mod response;

pub use internal::*;

/// The largest JSON body to accept. Submission forms are a few hundred
/// bytes.
const MAX_CONTENT_LENGTH: u64 = 64 * 1024;

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        error!(logger, "Backend error"; "context" => ?r.context, "error" => ?r.error, "status" => %status_code_for(e), "message" => %r.error);
        let flattened = r.flatten();

        return Ok(with_status(json(&flattened), status_code_for(e)));
    }

    Err(rej)
}

fn status_code_for(e: &BackendError) -> StatusCode {
    use BackendError::*;

    match e {
        Validation(..) => StatusCode::UNPROCESSABLE_ENTITY,
        NotFound(..) => StatusCode::NOT_FOUND,
        InvalidId(..) => StatusCode::BAD_REQUEST,
        Forbidden => StatusCode::FORBIDDEN,
        InvalidTransition(..) => StatusCode::CONFLICT,
        DataSource { .. } => StatusCode::BAD_GATEWAY,
        Network { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

mod internal {
    use warp::filters::BoxedFilter;
    use warp::path::end;
    use warp::Filter;
    use warp::Reply;
    use warp::{delete, get as g, path as p, path::param as par, post, put, query};

    use super::{handlers, query as q, MAX_CONTENT_LENGTH};
    use crate::environment::Environment;
    use crate::submission::SubmissionForm;

    type Route = BoxedFilter<(Box<dyn Reply>,)>;

    /// The identity of the caller, if any.
    fn user() -> BoxedFilter<(Option<String>,)> {
        warp::header::optional::<String>("x-user-id").boxed()
    }

    fn json_body<T: serde::de::DeserializeOwned + Send + 'static>() -> BoxedFilter<(T,)> {
        warp::body::content_length_limit(MAX_CONTENT_LENGTH)
            .and(warp::body::json())
            .boxed()
    }

    macro_rules! route_filter {
    ($route_variable:ident; $first:expr) => (let $route_variable = $route_variable.and($first););
    ($route_variable:ident; $first:expr, $($rest:expr),+) => (
        let $route_variable = $route_variable.and($first);
        route_filter!($route_variable; $($rest),+);
    )
}

    macro_rules! route {
    ($name:ident => $handler:ident, $route_variable:ident; $($filters:expr),+) => (
        pub fn $name(environment: Environment) -> Route {
            let r = environment.urls.api_path.clone();

            let $route_variable = warp::any()
                .map(move || environment.clone())
                .and(p(r));

            route_filter!($route_variable; $($filters),+);

            $route_variable.and_then(handlers::$handler)
                .boxed()
        }
    );
}

    route!(make_browse_route => browse, rt; p("tutorials"), end(), g(), query::<q::BrowseQuery>());
    route!(make_grouped_route => grouped, rt; p("tutorials"), p("grouped"), end(), g());
    route!(make_featured_route => featured, rt; p("tutorials"), p("featured"), end(), g(), query::<q::FeaturedQuery>());
    route!(make_languages_route => languages, rt; p("tutorials"), p("languages"), end(), g(), query::<q::LanguagesQuery>());
    route!(make_retrieve_route => retrieve, rt; p("tutorials"), p("id"), par::<String>(), end(), g());
    route!(make_submit_route => submit, rt; p("submissions"), end(), post(), user(), json_body::<SubmissionForm>());
    route!(make_submissions_route => submissions, rt; p("submissions"), end(), g(), user());
    route!(make_approve_route => approve, rt; p("submissions"), par::<String>(), p("approve"), end(), post(), user());
    route!(make_reject_route => reject, rt; p("submissions"), par::<String>(), end(), delete(), user());
    route!(make_saved_route => saved, rt; p("saved"), end(), g(), user());
    route!(make_toggle_saved_route => toggle_saved, rt; p("saved"), par::<String>(), p("toggle"), end(), post(), user());
    route!(make_saved_status_route => set_saved_status, rt; p("saved"), par::<String>(), p("status"), end(), put(), user(), json_body::<q::StatusUpdate>());
    route!(make_remove_saved_route => remove_saved, rt; p("saved"), par::<String>(), end(), delete(), user());

    /// Every API route, combined.
    pub fn make_api_routes(environment: Environment) -> Route {
        make_browse_route(environment.clone())
            .or(make_grouped_route(environment.clone()))
            .unify()
            .or(make_featured_route(environment.clone()))
            .unify()
            .or(make_languages_route(environment.clone()))
            .unify()
            .or(make_retrieve_route(environment.clone()))
            .unify()
            .or(make_submit_route(environment.clone()))
            .unify()
            .or(make_submissions_route(environment.clone()))
            .unify()
            .or(make_approve_route(environment.clone()))
            .unify()
            .or(make_reject_route(environment.clone()))
            .unify()
            .or(make_saved_route(environment.clone()))
            .unify()
            .or(make_toggle_saved_route(environment.clone()))
            .unify()
            .or(make_saved_status_route(environment.clone()))
            .unify()
            .or(make_remove_saved_route(environment))
            .unify()
            .boxed()
    }
}
