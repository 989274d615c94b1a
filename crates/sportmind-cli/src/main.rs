mod display;
mod server;
mod source;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde_json::Value;
use sportmind_ai::RegulationPipeline;
use sportmind_core::{SessionRecord, parse_session_date};
use sportmind_store::SessionStore;
use sportmind_sync::GatewayClient;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::server::AppState;
use crate::source::SessionSource;

const DEFAULT_MODEL_PATH: &str = "models/modelo_autoregulacion_emocional.json";

#[derive(Parser, Debug)]
#[command(
    name = "sportmind",
    version,
    about = "SportMind session viewer backend and emotional-regulation predictor"
)]
struct Cli {
    /// Model bundle (JSON) exported by the training pipeline
    #[arg(long, global = true, env = "SPORTMIND_MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    model: PathBuf,

    /// Root of the local session store (`<dir>/data/<date>/*.json`)
    #[arg(long, global = true, env = "SPORTMIND_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Read sessions from the API gateway instead of the local store
    #[arg(long, global = true, env = "USE_API_GATEWAY")]
    use_api_gateway: bool,

    #[arg(long, global = true, env = "API_GATEWAY_BASE_URL")]
    gateway_url: Option<String>,

    #[arg(long, global = true, env = "API_GATEWAY_API_KEY", hide_env_values = true)]
    gateway_api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API
    Serve {
        #[arg(long, env = "SPORTMIND_HTTP_ADDR", default_value = "127.0.0.1:5000")]
        addr: SocketAddr,
        /// Directory with the web viewer (`index.html`); skipped when absent
        #[arg(long, env = "SPORTMIND_STATIC_DIR", default_value = "static")]
        static_dir: PathBuf,
    },
    /// Annotate a session file (one record or an array) and print it as JSON
    Predict { file: PathBuf },
    /// Show the extracted and encoded features of a session file
    Features {
        file: PathBuf,
        /// Render all rows as one table instead of per-session cards
        #[arg(long)]
        table: bool,
    },
    /// List dates with uploaded sessions
    Dates,
    /// List the sessions uploaded on a date (YYYY-MM-DD)
    Sessions { date: String },
}

impl Cli {
    fn session_source(&self) -> anyhow::Result<SessionSource> {
        if !self.use_api_gateway {
            return Ok(SessionSource::Local(SessionStore::new(&self.data_dir)));
        }
        let Some(base_url) = self.gateway_url.clone().filter(|u| !u.is_empty()) else {
            bail!("API_GATEWAY_BASE_URL is required when USE_API_GATEWAY is set");
        };
        let client = GatewayClient::new(base_url, self.gateway_api_key.clone());
        info!(base_url = client.base_url(), "reading sessions from API gateway");
        Ok(SessionSource::Gateway(client))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("sportmind v{}", env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Command::Serve { addr, static_dir } => {
            let state = AppState {
                pipeline: RegulationPipeline::load(&cli.model),
                source: Arc::new(cli.session_source()?),
            };
            let static_dir = static_dir.is_dir().then_some(static_dir.as_path());
            if static_dir.is_none() {
                warn!("static directory not found; serving the API only");
            }
            server::serve(*addr, state, static_dir).await
        }
        Command::Predict { file } => cmd_predict(&cli.model, file),
        Command::Features { file, table } => cmd_features(&cli.model, file, *table),
        Command::Dates => cmd_dates(&cli.session_source()?).await,
        Command::Sessions { date } => {
            parse_session_date(date)?;
            let pipeline = RegulationPipeline::load(&cli.model);
            cmd_sessions(&cli.session_source()?, &pipeline, date).await
        }
    }
}

// ── Commands ──

fn cmd_predict(model: &Path, file: &Path) -> anyhow::Result<()> {
    let pipeline = RegulationPipeline::load(model);
    if !pipeline.is_enabled() {
        warn!("no classifier loaded; records will be printed without predictions");
    }

    let mut value = read_json(file)?;
    let annotated = match &mut value {
        Value::Array(records) => pipeline.annotate_all(records.iter_mut()),
        Value::Object(record) => usize::from(pipeline.annotate(record)),
        _ => bail!("{} must contain a JSON object or array", file.display()),
    };
    info!(annotated, "annotated records");

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn cmd_features(model: &Path, file: &Path, table: bool) -> anyhow::Result<()> {
    let pipeline = RegulationPipeline::load(model);
    let records = records_in(read_json(file)?)
        .with_context(|| format!("{} must contain a JSON object or array", file.display()))?;

    let mut batches = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let title = format!("session {}", i + 1);
        let encoded = match pipeline.encode(record) {
            Ok(row) => row,
            Err(e) => {
                warn!(session = i + 1, error = %e, "encoding failed; showing raw features");
                sportmind_ai::EncodedRow::raw(sportmind_ai::FeatureRow::extract(record))
            }
        };
        let batch = encoded.to_record_batch()?;

        if table {
            batches.push(batch);
            continue;
        }
        display::print_feature_card(&title, &batch);
        if pipeline.bundle().is_some() {
            match pipeline.features(record) {
                Ok(selected) => display::print_selected(&selected),
                Err(e) => println!("Model input unavailable: {e}\n"),
            }
        }
        display::print_prediction(pipeline.predict(record).as_ref());
    }

    if table {
        print!("{}", display::format_feature_table(&batches)?);
    }
    Ok(())
}

async fn cmd_dates(source: &SessionSource) -> anyhow::Result<()> {
    let page = source.dates().await?;
    for date in &page.dates {
        println!("{date}");
    }
    eprintln!("{} dates ({})", page.total, source.name());
    Ok(())
}

async fn cmd_sessions(
    source: &SessionSource,
    pipeline: &RegulationPipeline,
    date: &str,
) -> anyhow::Result<()> {
    let mut page = source.sessions(date).await?;
    pipeline.annotate_all(page.sessions.iter_mut());
    println!("{}", serde_json::to_string_pretty(&page.sessions)?);
    eprintln!(
        "{}: {} sessions ({})",
        page.date,
        page.total_sessions,
        source.name()
    );
    Ok(())
}

// ── Helpers ──

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}

/// The session objects in a file holding one record or an array of them.
fn records_in(value: Value) -> Option<Vec<SessionRecord>> {
    match value {
        Value::Object(record) => Some(vec![record]),
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(record) => Some(record),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}
