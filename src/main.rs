use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use taf_scraper::{
    config::Settings,
    delivery,
    progress::TracingProgress,
    routes::{self, AppState},
    scraper,
    taf_api::TafClient,
};
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "taf_scraper")]
#[command(about = "Export the TAF accreditation register as CSV")]
struct Cli {
    /// Settings file (defaults to ./config.toml when present)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve exports over HTTP at /api/export
    Serve,
    /// Run one export and write the CSV file
    Export(ExportArgs),
}

#[derive(Args)]
struct ExportArgs {
    /// Directory the CSV is written to (overrides output_dir)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    #[arg(long)]
    acc_id: Option<String>,

    #[arg(long)]
    code1: Option<String>,

    #[arg(long)]
    code2: Option<String>,

    #[arg(long)]
    lang: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "taf_scraper=info,tower_http=info".into()))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(s) => {
            tracing::info!("Configuration loaded successfully.");
            s
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {:#}", e);
            return Err(e);
        }
    };

    let client = TafClient::new(&settings.source).context("Failed to build HTTP client")?;
    tracing::info!(list_url = client.list_url(), "HTTP client created.");

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(settings, client).await,
        Commands::Export(args) => export_once(settings, client, args).await,
    }
}

async fn export_once(mut settings: Settings, client: TafClient, args: ExportArgs) -> Result<()> {
    if let Some(acc_id) = args.acc_id {
        settings.query.acc_id = acc_id;
    }
    if let Some(code1) = args.code1 {
        settings.query.code1 = code1;
    }
    if let Some(code2) = args.code2 {
        settings.query.code2 = code2;
    }
    if let Some(lang) = args.lang {
        settings.query.lang = lang;
    }
    settings.validate()?;

    let today = chrono::Utc::now().date_naive();
    let export = scraper::run_export(&client, &settings.query, &settings.pacing, today, &TracingProgress)
        .await
        .context("Export failed")?;

    let out_dir = args.out_dir.unwrap_or_else(|| PathBuf::from(&settings.output_dir));
    let path = delivery::save_export(&out_dir, &export).await?;
    tracing::info!("Wrote {} rows to {}", export.rows, path.display());
    Ok(())
}

async fn serve(settings: Settings, client: TafClient) -> Result<()> {
    let addr: SocketAddr = settings
        .server_address
        .parse()
        .with_context(|| format!("Invalid server address format: {}", settings.server_address))?;

    let app_state = AppState {
        settings: Arc::new(settings),
        client: Arc::new(client),
        progress: Arc::new(TracingProgress),
    };
    let app = routes::create_router(app_state);

    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => {
            tracing::info!("Server listening on {}", addr);
            l
        }
        Err(e) => {
            tracing::error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
