mod api;
mod cache;
mod config;
mod error;
mod export;
mod fetcher;
mod lateness;
mod models;
mod parser;

use anyhow::{Context, Result};
use api::CanvasClient;
use cache::JsonFileCache;
use chrono::Local;
use clap::{Parser, Subcommand};
use config::Config;
use models::{LatenessStats, StudentIdentifier};
use std::path::Path;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

#[derive(Parser)]
#[command(name = "canvas-lateness")]
#[command(
    about = "Generates spreadsheets with student submission timestamps for each assignment \
             and each student's total lateness.",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a course and report how late every submission was
    Run {
        /// Canvas course ID
        course_id: String,

        /// Identify students by "huid" or "name" in the results
        #[arg(
            long = "student_identifier",
            alias = "student-identifier",
            value_name = "huid|name",
            default_value = "huid"
        )]
        student_identifier: String,

        /// Use cached data rather than fetching from the API, if it is available
        #[arg(long = "use_cache", alias = "use-cache")]
        use_cache: bool,

        /// Log debugging information to the log file
        #[arg(long)]
        debug: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            course_id,
            student_identifier,
            use_cache,
            debug,
        } => {
            let output_dir = config::output_dir();
            let _log_guard = init_logging(&output_dir, debug)?;

            let identifier = StudentIdentifier::from_arg(&student_identifier);
            run(&course_id, identifier, use_cache, &output_dir).await
        }
    }
}

/// Console gets INFO; `output.log` gets INFO, or DEBUG with `--debug`
fn init_logging(output_dir: &Path, debug: bool) -> Result<WorkerGuard> {
    std::fs::create_dir_all(output_dir).with_context(|| {
        format!("Failed to create output directory {}", output_dir.display())
    })?;

    let file_appender = tracing_appender::rolling::never(output_dir, "output.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let file_level = if debug { "debug" } else { "info" };
    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(file_level));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(LevelFilter::INFO);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking_file)
        .with_filter(file_filter);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

async fn run(
    course_id: &str,
    identifier: StudentIdentifier,
    use_cache: bool,
    output_dir: &Path,
) -> Result<()> {
    debug!("Begin.");

    let cache = JsonFileCache::new(output_dir);
    let course = fetcher::load_course_data(course_id, &cache, use_cache, || {
        let config = Config::load().context("Failed to load configuration")?;
        Ok(CanvasClient::new(&config.canvas_api_url, config.oauth_token)?)
    })
    .await?;

    if course.students.is_empty() {
        info!("No students found in the course, so can't generate a report.");
        debug!("Done.");
        return Ok(());
    }

    let results = lateness::process(
        &course.students,
        &course.assignments,
        &course.submissions,
        identifier,
    )
    .context("Failed to compute lateness from course data")?;

    let today = Local::now().date_naive();
    let paths = export::write_reports(output_dir, course_id, today, &results)
        .context("Failed to write reports")?;

    let stats = LatenessStats::calculate(&results);
    info!(
        "{} students, {} assignments compared, {} with late work (mean {:.1}h, median {:.1}h)",
        stats.total_students,
        stats.total_assignments,
        stats.late_students,
        stats.average_hours,
        stats.median_hours
    );
    info!(
        "Reports written: {}, {}, {}",
        paths.results_json.display(),
        paths.delta_csv.display(),
        paths.lateness_csv.display()
    );

    debug!("Done.");
    Ok(())
}
