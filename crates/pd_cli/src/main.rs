use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use pd_core::{Error, Result, SavedSession, SessionStorage, Step1Data, Step2Data, Step3Data};
use pd_inference::InferenceConfig;
use pd_search::SearchConfig;
use pd_web::{create_app, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};

mod duration;
mod logging;

use duration::HumanDuration;

async fn check_storage(storage: &Arc<dyn SessionStorage>, storage_type: &str) -> Result<()> {
    let health_session = SavedSession {
        id: format!("healthcheck-{}", Utc::now().timestamp_millis()),
        created_at: Utc::now(),
        title: "Health check".to_string(),
        step1_data: Step1Data::default(),
        step2_data: Step2Data::default(),
        step3_data: Step3Data::default(),
        draft_versions: Vec::new(),
    };

    storage.save(&health_session).await?;
    let stored = storage.get(&health_session.id).await?;
    if stored.id != health_session.id {
        return Err(Error::Storage("Failed to retrieve health check session".to_string()));
    }

    if let Err(e) = storage.delete(&health_session.id).await {
        info!("⚠️ Failed to clean up health check session: {}", e);
    }

    info!("🏦 Storage backend initialized successfully (using {})", storage_type);
    Ok(())
}

async fn check_storage_with_retry(
    storage: &Arc<dyn SessionStorage>,
    storage_type: &str,
    max_retries: u32,
    timeout: Duration,
) -> Result<()> {
    let mut retries = 0;
    let mut last_error = None;

    while retries < max_retries {
        match tokio::time::timeout(timeout, check_storage(storage, storage_type)).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => last_error = Some(e),
            Err(timeout_error) => {
                last_error = Some(Error::Storage(format!("Storage health check timed out: {}", timeout_error)));
            }
        }
        retries += 1;
        if retries < max_retries {
            info!("Storage health check failed, retrying {}/{}...", retries, max_retries);
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    }

    Err(last_error.unwrap_or_else(|| Error::Storage("Storage health check failed after all retries".to_string())))
}

/// Structured summary and section cards of the latest draft in a session.
fn draft_overview(session: &SavedSession) -> Result<serde_json::Value> {
    let draft = session
        .draft_versions
        .last()
        .ok_or_else(|| Error::NotFound(format!("No drafts in session {}", session.id)))?;

    Ok(serde_json::json!({
        "version": draft.version,
        "summary": pd_inference::draft::parse_structured_summary(&draft.content, &session.title),
        "sections": pd_inference::draft::parse_draft_sections(&draft.content),
    }))
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Patent draft assistant", long_about = None)]
pub struct Cli {
    #[arg(long, env = "PATDRAFT_MODEL", default_value = "ollama", help = "Model backend. Available models: ollama (default), gemini, dummy")]
    model: String,
    #[arg(long, env = "AI_API_URL")]
    model_url: Option<String>,
    /// Model name sent to the backend (default gpt-oss:120b-128k for ollama)
    #[arg(long, env = "API_MODEL")]
    model_name: Option<String>,
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long, env = "PATDRAFT_SEARCH", default_value = "biznavi", help = "Patent search source: biznavi, files or llm")]
    search: String,
    #[arg(long, env = "BIZNAVI_API_URL")]
    search_url: Option<String>,
    /// Directory of patent JSON files for the `files` search source
    #[arg(long, env = "PATDRAFT_PATENTS_DIR")]
    patents_dir: Option<PathBuf>,
    /// How long loaded patent files stay cached (e.g. 1h, 30m, 1h15m30s)
    #[arg(long, default_value = "1h")]
    cache_ttl: HumanDuration,
    #[arg(long, env = "PATDRAFT_STORAGE", default_value = "file", help = "Session storage: file or memory")]
    storage: String,
    #[arg(long, env = "PATDRAFT_DATA_DIR")]
    data_dir: Option<PathBuf>,
    #[arg(long, default_value = "info")]
    log_level: Level,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        #[arg(long, default_value = "0.0.0.0:3000")]
        bind: String,
    },
    /// Inspect saved sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Extract keywords from a memo file and print them as JSON
    Extract { file: PathBuf },
}

#[derive(clap::Subcommand, Debug)]
enum SessionCommands {
    List,
    Show {
        id: String,
        /// Print the section cards and summary of the latest draft instead of the raw session
        #[arg(long)]
        summary: bool,
    },
    Delete { id: String },
}

impl Cli {
    fn inference_config(&self) -> InferenceConfig {
        InferenceConfig {
            model: self.model.clone(),
            model_url: self.model_url.clone(),
            model_name: self.model_name.clone(),
            api_key: self.api_key.clone(),
        }
    }

    fn search_config(&self) -> SearchConfig {
        SearchConfig {
            source: self.search.clone(),
            base_url: self.search_url.clone(),
            data_dir: self.patents_dir.clone(),
            cache_ttl: self.cache_ttl.0,
            ..Default::default()
        }
        .with_env_tokens()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level);

    let storage = pd_storage::create_storage(&cli.storage, cli.data_dir.as_deref()).await?;

    match &cli.command {
        Commands::Serve { bind } => {
            info!("💾 Checking storage connection...");
            check_storage_with_retry(&storage, &cli.storage, 3, Duration::from_secs(10)).await?;

            let model = pd_inference::create_model(&cli.inference_config()).await?;
            let search = pd_search::create_search(&cli.search_config(), model.clone())?;

            let app = create_app(AppState::new(model, search, storage)).await;
            let listener = tokio::net::TcpListener::bind(bind)
                .await
                .with_context(|| format!("failed to bind {}", bind))?;
            info!("🚀 Listening on http://{}", bind);
            axum::serve(listener, app).await?;
        }
        Commands::Sessions { command } => match command {
            SessionCommands::List => {
                let sessions = storage.list().await?;
                for s in &sessions {
                    println!(
                        "{}\t{}\t{}\t{} draft(s)\t{}",
                        s.id,
                        s.created_at.format("%Y-%m-%d %H:%M"),
                        s.title,
                        s.draft_count,
                        s.keywords.join(", ")
                    );
                }
                info!("Found {} saved sessions", sessions.len());
            }
            SessionCommands::Show { id, summary: false } => {
                let session = storage.get(id).await?;
                println!("{}", serde_json::to_string_pretty(&session)?);
            }
            SessionCommands::Show { id, summary: true } => {
                let session = storage.get(id).await?;
                println!("{}", serde_json::to_string_pretty(&draft_overview(&session)?)?);
            }
            SessionCommands::Delete { id } => {
                storage.delete(id).await?;
                println!("삭제되었습니다: {}", id);
            }
        },
        Commands::Extract { file } => {
            let text = tokio::fs::read_to_string(file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let model = pd_inference::create_model(&cli.inference_config()).await?;
            info!("🔑 Extracting keywords with {}", model.name());
            let data = pd_inference::extract_invention_data(model.as_ref(), &text).await?;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
    }

    Ok(())
}
