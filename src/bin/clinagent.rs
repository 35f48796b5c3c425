//! `clinagent ingest` runs the offline pipeline (C1-C5) once; `clinagent
//! serve` boots the online HTTP surface (spec §6). Both share one
//! `AppConfig` read from the environment and fail fast on
//! misconfiguration rather than at first request.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use clinagent::agent::checkpoint::SqliteCheckpointer;
use clinagent::app_state::AppState;
use clinagent::collaborators::openai::OpenAiClient;
use clinagent::collaborators::vision::{HttpMedicalEntityClient, HttpOcrClient};
use clinagent::config::AppConfig;
use clinagent::db;
use clinagent::http::server;
use clinagent::pipeline::{ingest, index::VectorIndex};

#[derive(Parser)]
#[command(name = "clinagent", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the ingestion pipeline (OCR -> entities -> summary -> structure -> index) once.
    Ingest {
        /// Directory of source images; defaults to `<data_dir>/raw_images`.
        #[arg(long, value_name = "DIR")]
        input_dir: Option<PathBuf>,

        /// Reprocess every document regardless of persisted artifacts.
        #[arg(long)]
        force: bool,
    },
    /// Boot the HTTP surface (`POST /generate`, `GET /`, `GET /search`).
    Serve {
        /// Address to bind, e.g. `0.0.0.0:3000`.
        #[arg(long, value_name = "ADDR", default_value = "0.0.0.0:3000")]
        addr: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    clinagent::init_tracing();
    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command {
        Command::Ingest { input_dir, force } => run_ingest(&config, input_dir, force),
        Command::Serve { addr } => run_serve(config, &addr).await,
    }
}

fn run_ingest(config: &AppConfig, input_dir: Option<PathBuf>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let images_dir = input_dir.unwrap_or_else(|| config.raw_images_dir());

    let ocr_client = HttpOcrClient::new(&config.ocr_endpoint);
    let medical_client = HttpMedicalEntityClient::new(&config.medical_endpoint);
    let llm_client = OpenAiClient::new(
        &config.openai_base_url,
        &config.openai_api_key,
        &config.chat_model,
        &config.embedding_model,
    );
    let embedder = OpenAiClient::new(
        &config.openai_base_url,
        &config.openai_api_key,
        &config.chat_model,
        &config.embedding_model,
    );

    let report = ingest::run(config, &images_dir, force, &ocr_client, &medical_client, &llm_client, &embedder)?;
    tracing::info!(
        images_extracted = report.images_extracted,
        documents_with_entities = report.documents_with_entities,
        documents_structured = report.documents_structured,
        documents_indexed = report.documents_indexed,
        "ingestion run complete"
    );
    Ok(())
}

async fn run_serve(config: AppConfig, addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = addr.parse()?;

    let llm_client = Arc::new(OpenAiClient::new(
        &config.openai_base_url,
        &config.openai_api_key,
        &config.chat_model,
        &config.embedding_model,
    ));
    let embedder = Arc::new(OpenAiClient::new(
        &config.openai_base_url,
        &config.openai_api_key,
        &config.chat_model,
        &config.embedding_model,
    ));
    let index = Arc::new(VectorIndex::load_or_empty(&config.index_dir)?);
    let connection = db::open_database(&config.checkpoint_db)?;
    let checkpointer = Arc::new(SqliteCheckpointer::new(connection));

    let state = Arc::new(AppState::new(config, llm_client, embedder, index, checkpointer));
    server::serve(addr, state).await?;
    Ok(())
}
