//! askq CLI: run the ask queue service or dry-run admission.

use askq::admission::{ModerationGate, ModerationPolicy, TierClassifier, normalize};
use askq::api::{AppState, serve};
use askq::config::Config;
use askq::engine::{AnswerPump, Engine};
use askq::generate::{Generator, StandbyGenerator};
use askq::llm::{GenerationProfile, RigGenerator, anthropic_client};
use askq::storage::Storage;
use askq::telemetry::{TelemetryConfig, init_telemetry};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "askq", about = "Prioritized ask queue with a live answer pump")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API and the answer pump
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(long)]
        port: Option<u16>,
        /// Directory for queue and history files (overrides DATA_DIR)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Show how a question would be admitted, without queueing it
    Check {
        /// Question text
        text: String,
        /// Amount backing the ask, in cents
        #[arg(long, default_value_t = 0)]
        amount_cents: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Serve { port, data_dir } => cmd_serve(config, port, data_dir).await,
        Command::Check { text, amount_cents } => cmd_check(&config, &text, amount_cents),
    }
}

fn moderation_gate(config: &Config) -> anyhow::Result<ModerationGate> {
    let policy = match &config.moderation_policy {
        Some(path) => ModerationPolicy::load(path)?,
        None => ModerationPolicy::default(),
    };
    Ok(ModerationGate::new(&policy)?)
}

fn generator(config: &Config) -> anyhow::Result<Arc<dyn Generator>> {
    let Some(key) = &config.anthropic_api_key else {
        warn!("ANTHROPIC_API_KEY not set, answering with standby placeholder");
        return Ok(Arc::new(StandbyGenerator));
    };
    let client = anthropic_client(key).map_err(|e| anyhow::anyhow!("anthropic client: {e}"))?;
    let mut generator = RigGenerator::new(
        client,
        GenerationProfile::new(&config.model_standard),
        GenerationProfile::new(&config.model_priority),
    );
    if let Some(preamble) = &config.answer_preamble {
        generator = generator.preamble(preamble);
    }
    Ok(Arc::new(generator))
}

async fn cmd_serve(
    mut config: Config,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "askq".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let storage = Storage::open(data_dir.unwrap_or_else(|| config.data_dir.clone()))?;
    if let Some(path) = storage.path() {
        info!(db = %path.display(), "storage ready");
    }

    let engine = Engine::open(config.engine_config(), moderation_gate(&config)?, storage);
    let pump = AnswerPump::new(engine.clone(), generator(&config)?, config.pump_config());

    let runner = pump.clone();
    let pump_task = tokio::spawn(async move { runner.run().await });

    let addr = SocketAddr::from(([0, 0, 0, 0], port.unwrap_or(config.port)));
    let state = AppState::new(engine, config.intake_config())
        .with_admin_token(config.admin_token.take());
    serve(addr, state, async {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown requested");
    })
    .await?;

    pump.shutdown();
    pump_task.await??;
    Ok(())
}

fn cmd_check(config: &Config, text: &str, amount_cents: u64) -> anyhow::Result<()> {
    let gate = moderation_gate(config)?;
    let tiers = TierClassifier::new(config.priority_tier_min_cents);

    if text.trim().is_empty() {
        println!("rejected: missing question");
        return Ok(());
    }
    if gate.should_block(text) {
        println!("rejected: blocked by moderation");
        return Ok(());
    }

    println!("text: {}", normalize(text, config.max_question_chars));
    println!("tier: {}", tiers.classify(amount_cents));
    Ok(())
}
