mod config;

use std::fs::File;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use billmanager_api::AppState;
use billmanager_core::{
    import_csv, services, BillService, CreationFailurePolicy, ImportOptions, ImportSummary,
    RegisterUserRequest,
};
use billmanager_repository::{InMemoryRepository, PostgresRepository, Role};
use clap::{Args, Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use config::AppConfig;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Bill manager API server and CSV importer", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP API server
    Serve(ServeArgs),
    /// Run database migrations
    Migrate,
    /// Import bills from a CSV file
    Import(ImportArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Keep everything in memory instead of Postgres
    #[arg(long)]
    in_memory: bool,
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// CSV file to import
    path: PathBuf,

    /// Declared media type of the file
    #[arg(long, default_value = "text/csv")]
    content_type: String,

    /// What to do when bill creation rejects a record: isolate or abort
    #[arg(long)]
    on_failure: Option<CreationFailurePolicy>,

    /// Keep everything in memory instead of Postgres
    #[arg(long)]
    in_memory: bool,

    /// Register this user before importing (repeatable)
    #[arg(long = "seed-user", value_name = "EMAIL")]
    seed_users: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve(args) => serve(&config, args).await,
        Command::Migrate => {
            let repo = connect(&config).await?;
            repo.run_migrations().await?;
            info!("Database migrations applied");
            Ok(())
        }
        Command::Import(args) => import(&config, args).await,
    }
}

async fn connect(config: &AppConfig) -> Result<PostgresRepository> {
    let database_url = config.require_database_url()?;
    PostgresRepository::connect(database_url, config.max_connections)
        .await
        .context("failed to connect to database")
}

async fn build_service(config: &AppConfig, in_memory: bool) -> Result<BillService> {
    if in_memory {
        warn!("Using the in-memory store; data is lost on exit");
        return Ok(services(Arc::new(InMemoryRepository::new())));
    }
    let repo = connect(config).await?;
    repo.run_migrations().await?;
    Ok(services(Arc::new(repo)))
}

async fn serve(config: &AppConfig, args: ServeArgs) -> Result<()> {
    let bills = build_service(config, args.in_memory).await?;
    let state = AppState::new(bills)
        .with_import_options(ImportOptions {
            on_failure: config.on_failure,
        })
        .with_max_upload_bytes(config.max_upload_bytes);

    let bind = args.bind.unwrap_or(config.bind);
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(
        address = %listener.local_addr()?,
        on_failure = %config.on_failure,
        "listening"
    );

    axum::serve(listener, billmanager_api::router(state).into_make_service()).await?;
    Ok(())
}

async fn import(config: &AppConfig, args: ImportArgs) -> Result<()> {
    let bills = build_service(config, args.in_memory).await?;

    for email in &args.seed_users {
        if bills.users().exists(email).await? {
            continue;
        }
        bills
            .users()
            .register(&RegisterUserRequest {
                email: email.clone(),
                role: Role::User,
            })
            .await?;
    }

    let file = File::open(&args.path)
        .with_context(|| format!("Failed to open CSV file at '{}'", args.path.display()))?;
    let options = ImportOptions {
        on_failure: args.on_failure.unwrap_or(config.on_failure),
    };

    let summary = import_csv(&bills, Some(args.content_type.as_str()), file, &options)
        .await
        .with_context(|| format!("Failed to import '{}'", args.path.display()))?;

    info!(
        file = %args.path.display(),
        total = summary.total_records(),
        succeeded = summary.succeeded(),
        failed = summary.failed(),
        "import summary"
    );
    println!("{}", summary_table(&summary));
    println!("{}", summary.message);
    Ok(())
}

fn summary_table(summary: &ImportSummary) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Row",
            "Status",
            "Bill ID",
            "Due Date",
            "Payment Date",
            "Amount",
            "Description",
            "User",
        ]);

    for outcome in &summary.outcomes {
        match &outcome.bill {
            Some(bill) => table.add_row(vec![
                Cell::new(outcome.row),
                Cell::new("imported"),
                Cell::new(bill.id),
                Cell::new(bill.due_date),
                Cell::new(bill.payment_date),
                Cell::new(bill.amount),
                Cell::new(&bill.description),
                Cell::new(&bill.user.email),
            ]),
            None => table.add_row(vec![
                Cell::new(outcome.row),
                Cell::new("rejected"),
                Cell::new(""),
                Cell::new(""),
                Cell::new(""),
                Cell::new(""),
                Cell::new(""),
                Cell::new(""),
            ]),
        };
    }

    table
}
