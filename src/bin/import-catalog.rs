use std::error::Error;
use std::path::PathBuf;

use dotenv::dotenv;
use structopt::StructOpt;

use codeclips::config::get_variable;
use codeclips::db::{CatalogSource, PgDb};
use codeclips::normalization::RawTutorial;
use codeclips::tutorial::{NewTutorial, PublicationStatus, Tutorial};
use log::{debug, info, initialize_logger, o};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "import-catalog",
    about = "Normalize a JSON array of tutorials and publish them to the catalog"
)]
struct Opt {
    /// The JSON file to import
    #[structopt(parse(from_os_str))]
    file: PathBuf,

    /// Print the normalized records without writing anything
    #[structopt(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    let opt = Opt::from_args();

    let logger = initialize_logger();

    let json = tokio::fs::read(&opt.file).await?;
    let raw: Vec<RawTutorial> = serde_json::from_slice(&json)?;
    let tutorials: Vec<Tutorial> = raw.into_iter().map(RawTutorial::normalize).collect();

    info!(logger, "Importing {} tutorials...", tutorials.len(); "file" => %opt.file.display());

    if opt.dry_run {
        println!("{}", serde_json::to_string_pretty(&tutorials)?);
        return Ok(());
    }

    let connection_string = get_variable("CODECLIPS_DB_CONNECTION_STRING");
    let pool = sqlx::postgres::PgPool::connect(&connection_string)
        .await
        .expect("create database pool from CODECLIPS_DB_CONNECTION_STRING");
    let db = PgDb::new(pool);

    let mut ids = vec![];

    for tutorial in tutorials {
        let logger = logger.new(o!("title" => tutorial.title.clone()));

        let created = db.create(into_new(tutorial)).await?;
        debug!(logger, "Published tutorial"; "id" => %created.id);

        ids.push(created.id);
    }

    println!(
        "Published tutorials:\n{}",
        ids.into_iter()
            .map(|id| format!("{}", id))
            .collect::<Vec<_>>()
            .join("\n")
    );

    Ok(())
}

/// The store assigns its own IDs, so any ID in the file is dropped.
fn into_new(tutorial: Tutorial) -> NewTutorial {
    NewTutorial {
        title: tutorial.title,
        url: tutorial.url,
        image_url: tutorial.image_url,
        kind: tutorial.kind,
        summary: tutorial.summary,
        tags: tutorial.tags,
        difficulty: tutorial.difficulty,
        language: tutorial.language,
        category: tutorial.category,
        estimated_time: tutorial.estimated_time,
        status: PublicationStatus::Published,
    }
}
