use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use roster_import_service::config::Config;
use roster_import_service::services::{ImportOptions, RosterImportService};
use sqlx::postgres::PgPoolOptions;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "import-roster")]
#[command(about = "Import a learner roster workbook (.xlsx/.xls) into the database", long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env)]
    database_url: String,

    /// Path to the roster workbook
    #[arg(long)]
    file: PathBuf,

    /// Parse and validate only, nothing is written
    #[arg(long)]
    preview: bool,

    /// Fail records whose ficha does not exist
    #[arg(long)]
    validate_fichas: bool,

    /// Do not create fichas that are missing
    #[arg(long)]
    no_create_fichas: bool,

    /// Update learners that already exist
    #[arg(long)]
    update_existing: bool,

    /// Try to insert learners that already exist instead of skipping them
    #[arg(long)]
    no_skip_duplicates: bool,

    /// Only document number and names reject a record
    #[arg(long)]
    flexible: bool,

    /// Run database migrations before importing
    #[arg(long)]
    migrate: bool,
}

impl Cli {
    fn options(&self) -> ImportOptions {
        ImportOptions {
            validate_fichas: self.validate_fichas,
            create_missing_fichas: !self.no_create_fichas,
            update_existing: self.update_existing,
            skip_duplicates: !self.no_skip_duplicates,
            flexible_validation: self.flexible,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    // Logs go to stderr, the JSON report to stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::with_database_url(&cli.database_url);
    let file_name = cli
        .file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or("--file must point to a workbook")?;

    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;

    if cli.migrate {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let service = RosterImportService::new(pool, config.import_defaults());
    let options = cli.options();

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(120));

    let json = if cli.preview {
        pb.set_message(format!("Previewing {file_name}..."));
        let preview = service
            .preview_workbook(&cli.file, &file_name, &options)
            .await?;
        pb.finish_with_message(format!(
            "✓ {} sheets, {} valid of {} records",
            preview.total_sheets, preview.valid_records, preview.total_records
        ));
        serde_json::to_string_pretty(&preview)?
    } else {
        pb.set_message(format!("Importing {file_name}..."));
        let report = service
            .import_workbook(&cli.file, &file_name, &options)
            .await?;
        pb.finish_with_message(format!(
            "✓ {} imported, {} updated, {} skipped, {} errors",
            report.summary.imported_records,
            report.summary.updated_records,
            report.summary.skipped_records,
            report.summary.error_records
        ));
        if !report.success {
            warn!("Import finished with {} errors", report.errors.len());
        }
        serde_json::to_string_pretty(&report)?
    };

    println!("{json}");
    Ok(())
}
