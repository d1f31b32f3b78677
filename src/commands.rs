use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::desk::HelpDesk;
use crate::evaluation::{load_test_cases, run_evaluation};
use crate::knowledge::{Embedder, KnowledgeBase};
use crate::llm::OpenAiClient;
use crate::models::{HelpDeskRequest, HelpDeskResponse};

/// Resolve the configuration directory, defaulting to `~/.help-desk`
#[inline]
pub fn resolve_config_dir(config_dir: Option<PathBuf>) -> Result<PathBuf> {
    config_dir.map_or_else(
        || Config::default_dir().context("Could not determine configuration directory"),
        Ok,
    )
}

fn load_config(config_dir: &Path) -> Result<Config> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;
    if config.openai.resolved_api_key().is_none() {
        warn!(
            "No API key configured; set it with `help-desk config` or the {} environment variable",
            crate::config::settings::API_KEY_ENV_VAR
        );
    }
    Ok(config)
}

async fn start_desk(config: &Config) -> Result<HelpDesk> {
    HelpDesk::from_config(config)
        .await
        .context("Failed to initialize help desk")
}

/// Submit one message and print the response
#[inline]
pub async fn ask(
    config_dir: &Path,
    message: String,
    user_id: Option<String>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_dir)?;
    let desk = start_desk(&config).await?;

    let request = HelpDeskRequest {
        user_id,
        timestamp: Some(chrono::Utc::now().to_rfc3339()),
        ..HelpDeskRequest::new(message)
    };
    let response = desk.process_request(request).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response);
    }

    Ok(())
}

fn print_response(response: &HelpDeskResponse) {
    let classification = &response.classification;

    println!("🎫 Request {}", response.request_id);
    println!("{}", "=".repeat(50));
    println!("📂 Category: {}", classification.category);
    println!("💭 Reasoning: {}", classification.reasoning);
    if classification.escalate {
        println!(
            "🚨 Escalated: {}",
            classification.escalate_reason.as_deref().unwrap_or("no reason given")
        );
    }
    println!();
    println!("{}", response.response_message);
}

/// Re-ingest every source document and replace the persisted knowledge base
#[inline]
pub async fn rebuild(config_dir: &Path) -> Result<()> {
    let config = load_config(config_dir)?;
    let client = Arc::new(OpenAiClient::new(&config.openai)?);
    let embedder = Embedder::from_config(client, &config.openai);

    info!("Rebuilding knowledge base in {}", config.get_base_dir().display());
    let knowledge = KnowledgeBase::rebuild(&config, &embedder)
        .await
        .context("Failed to rebuild knowledge base")?;

    println!("✅ Knowledge base rebuilt with {} records", knowledge.len());
    println!("   Records: {}", config.records_path().display());
    println!("   Vectors: {}", config.vector_database_path().display());

    Ok(())
}

/// Report the API reachability and per-component pipeline health
#[inline]
pub async fn health(config_dir: &Path, json: bool) -> Result<()> {
    let config = load_config(config_dir)?;

    let api_status = OpenAiClient::new(&config.openai).and_then(|client| client.ping());
    let desk = start_desk(&config).await?;
    let health = desk.system_health();

    if json {
        println!("{}", serde_json::to_string_pretty(&health)?);
        return Ok(());
    }

    println!("📊 Help Desk Health Report");
    println!("{}", "=".repeat(50));
    match api_status {
        Ok(()) => println!("🤖 API: ✅ reachable ({})", config.openai.api_base),
        Err(e) => println!("🤖 API: ❌ unreachable - {:#}", e),
    }
    for (component, status) in &health.components {
        let marker = if status == "healthy" { "✅" } else { "❌" };
        println!("   {} {}: {}", marker, component, status);
    }
    println!();
    println!("Overall: {} ({})", health.status, health.timestamp);

    Ok(())
}

/// Replay the scripted test requests and print a score per case
#[inline]
pub async fn evaluate(config_dir: &Path, path: Option<PathBuf>, json: bool) -> Result<()> {
    let config = load_config(config_dir)?;
    let path = path.unwrap_or_else(|| config.test_requests_path());
    let cases = load_test_cases(&path)
        .with_context(|| format!("Failed to load test requests from {}", path.display()))?;

    let desk = start_desk(&config).await?;
    let report = run_evaluation(&desk, &cases).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("🧪 Evaluation of {} test requests", report.summary.total);
    println!("{}", "=".repeat(50));
    for result in &report.results {
        let marker = if result.correct_classification && result.escalation_correct {
            "✅"
        } else {
            "❌"
        };
        println!(
            "{} {}: expected {}, predicted {}, elements {}/{}",
            marker,
            result.test_id,
            result.expected_category,
            result.predicted_category,
            result.found_elements.len(),
            result.expected_elements.len()
        );
    }

    let summary = &report.summary;
    println!();
    println!(
        "Classification: {}/{}",
        summary.correct_classifications, summary.total
    );
    println!("Escalation: {}/{}", summary.correct_escalations, summary.total);
    println!("Average response quality: {:.2}", summary.average_quality);

    Ok(())
}
