use std::error::Error;
use std::sync::Arc;

use futures::future::FutureExt;
use tokio::sync::mpsc;
use warp::Filter;

use codeclips::catalog::DEFAULT_PAGE_SIZE;
use codeclips::config::{get_optional_variable, get_variable, parse_page_size, Backend};
use codeclips::db::{memory::MemoryDb, PgDb};
use codeclips::environment::{Config, Environment};
use codeclips::routes;
use codeclips::saved::LocalSavedStore;
use codeclips::urls::Urls;
use log::{info, initialize_logger, Logger};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    #[cfg(feature = "env_logging")]
    let _guard = log::initialize_env_logging();

    let logger = initialize_logger();

    let main_port: u16 = get_variable("CODECLIPS_PORT")
        .parse()
        .expect("parse CODECLIPS_PORT as u16");
    let admin_port: u16 = get_variable("CODECLIPS_ADMIN_PORT")
        .parse()
        .expect("parse CODECLIPS_ADMIN_PORT as u16");

    info!(logger, "Starting..."; "main_port" => main_port, "admin_port" => admin_port);
    let logger = Arc::new(logger);

    let urls = Arc::new(Urls::new(
        get_variable("CODECLIPS_BASE_URL"),
        get_optional_variable("CODECLIPS_API_PATH").unwrap_or_else(|| "api".to_owned()),
    ));

    let page_size = get_optional_variable("CODECLIPS_PAGE_SIZE")
        .map(|s| parse_page_size(&s).expect("parse CODECLIPS_PAGE_SIZE as a positive integer"))
        .unwrap_or(DEFAULT_PAGE_SIZE);
    let config = Config::new(page_size, get_optional_variable("CODECLIPS_ADMIN_UID"));

    let local_saved = match get_optional_variable("CODECLIPS_LOCAL_SAVED_PATH") {
        Some(path) => LocalSavedStore::load(path).await?,
        None => LocalSavedStore::in_memory(),
    };
    let local_saved = Arc::new(local_saved);

    let backend: Backend = get_variable("CODECLIPS_BACKEND")
        .parse()
        .expect("parse CODECLIPS_BACKEND as postgres or memory");

    let environment = match backend {
        Backend::Postgres => {
            info!(logger, "Creating database pool...");
            let connection_string = get_variable("CODECLIPS_DB_CONNECTION_STRING");
            let pool = sqlx::postgres::PgPool::connect(&connection_string)
                .await
                .expect("create database pool from CODECLIPS_DB_CONNECTION_STRING");

            Environment::new(logger.clone(), Arc::new(PgDb::new(pool)), local_saved, urls, config)
        }
        Backend::Memory => {
            let db = match get_optional_variable("CODECLIPS_SEED_PATH") {
                Some(path) => {
                    info!(logger, "Seeding in-memory catalog..."; "path" => &path);
                    MemoryDb::from_file(path).await?
                }
                None => MemoryDb::new(),
            };

            Environment::new(logger.clone(), Arc::new(db), local_saved, urls, config)
        }
    };

    serve(logger.clone(), environment, main_port, admin_port).await;

    info!(logger, "Exiting gracefully...");

    Ok(())
}

async fn serve(logger: Arc<Logger>, environment: Environment, main_port: u16, admin_port: u16) {
    let (termination_sender, mut termination_receiver) = mpsc::channel::<()>(1);

    let terminate = Arc::new(move || {
        let termination_sender = termination_sender.clone();

        async move {
            // the receiver only goes away once both servers have stopped
            let _ = termination_sender.send(()).await;
        }
        .boxed()
    });

    let should_terminate = async move {
        termination_receiver.recv().await;
    }
    .shared();

    let ctrlc = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        let signal = tokio::signal::ctrl_c();

        async move {
            tokio::select! {
                _ = should_terminate => {},
                _ = signal => {
                    terminate().await;
                }
            }
        }
    };

    let main_server = {
        let should_terminate = should_terminate.clone();

        let routes = routes::make_api_routes(environment.clone())
            .recover(move |r| routes::format_rejection(logger.clone(), r));

        let (_, main_server) =
            warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], main_port), async {
                should_terminate.await;
            });

        main_server
    };

    let admin_server = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        let routes = routes::admin::make_healthz_route(environment.clone()).or(
            routes::admin::make_termination_route(environment.clone(), terminate),
        );

        let (_, admin_server) =
            warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], admin_port), async {
                should_terminate.await;
            });

        admin_server
    };

    tokio::join!(ctrlc, main_server, admin_server);
}
