use anyhow::{Context, Result};
use chrono::Utc;
use clap::{App, Arg};
use feuillet::config::Config;
use feuillet::page::{PageController, Query, Status};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    init_tracing();
    match run() {
        Ok(status) => std::process::exit(match status {
            Status::Ok => 0,
            Status::Error => 1,
            Status::NotFound => 2,
        }),
        Err(err) => {
            tracing::error!(error = %err, "fatal error");
            eprintln!("fatal error: {:#}", err);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<Status> {
    let matches = App::new("feuillet")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Renders the blog page for a query string and prints it to stdout")
        .arg(
            Arg::with_name("query")
                .value_name("QUERY")
                .help("The request's query string (e.g., `articleId=7`); omit for the article list")
                .index(1),
        )
        .arg(
            Arg::with_name("article-id")
                .long("article-id")
                .value_name("ID")
                .takes_value(true)
                .conflicts_with("query")
                .help("Shorthand for the query string `articleId=ID`"),
        )
        .arg(
            Arg::with_name("config")
                .long("config")
                .value_name("FILE")
                .takes_value(true)
                .help("The project file (default: search for `feuillet.yaml` from the working directory up)"),
        )
        .arg(
            Arg::with_name("data")
                .long("data")
                .value_name("FILE")
                .takes_value(true)
                .help("The JSON data file, overriding the configured one"),
        )
        .get_matches();

    let mut config = match matches.value_of("config") {
        Some(path) => Config::from_project_file(Path::new(path))?,
        None => Config::from_directory(
            &std::env::current_dir().context("Getting the working directory")?,
        )?,
    };
    config.apply_overrides(|name| std::env::var(name).ok())?;
    if let Some(data) = matches.value_of("data") {
        config.data_file = PathBuf::from(data);
    }

    let query = match matches.value_of("article-id") {
        Some(id) => Query {
            article_id: Some(id.to_owned()),
        },
        None => Query::parse(matches.value_of("query").unwrap_or_default()),
    };

    let controller = PageController::new(&config)?;
    let page = controller.render_page(&query, Utc::now())?;
    tracing::info!(
        status = ?page.status,
        article_id = ?query.article_id,
        data_file = %config.data_file.display(),
        "rendered page"
    );
    let mut stdout = std::io::stdout();
    stdout
        .write_all(page.html.as_bytes())
        .and_then(|_| stdout.flush())
        .context("Writing page to stdout")?;
    Ok(page.status)
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .ok()
        .unwrap_or_else(|| "info".to_string());

    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(env_filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    if subscriber.try_init().is_err() {
        tracing::warn!("tracing subscriber already initialised");
    }
}
