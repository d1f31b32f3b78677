
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};
use std::path::Path;

use super::{Config, ConfigError, OpenAiConfig};

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Help Desk Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("LLM API Configuration").bold().yellow());
    eprintln!("Configure the OpenAI compatible API used for classification, responses and embeddings.");
    eprintln!();

    configure_openai(&mut config.openai)?;

    eprintln!();
    eprintln!("{}", style("Pipeline Tuning").bold().yellow());
    configure_thresholds(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_api_connection(&config.openai) {
        eprintln!("{}", style("✓ API connection successful!").green());
    } else {
        eprintln!("{}", style("⚠ Warning: Could not reach the API").yellow());
        eprintln!("You can continue, but requests will fall back to canned responses until it is reachable.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("LLM API Settings:").bold().yellow());
    match config.openai.api_url() {
        Ok(url) => eprintln!("  API Base: {}", style(url).cyan()),
        Err(e) => eprintln!("  API Base: {} ({})", style("Invalid").red(), e),
    }
    let key_state = if config.openai.resolved_api_key().is_some() {
        style("set").green()
    } else {
        style("missing").red()
    };
    eprintln!("  API Key: {}", key_state);
    eprintln!("  Chat Model: {}", style(&config.openai.chat_model).cyan());
    eprintln!(
        "  Embedding Model: {} ({} dimensions)",
        style(&config.openai.embedding_model).cyan(),
        style(config.openai.embedding_dimension).cyan()
    );
    eprintln!("  Batch Size: {}", style(config.openai.batch_size).cyan());

    eprintln!();
    eprintln!("{}", style("Pipeline Settings:").bold().yellow());
    eprintln!(
        "  Similarity Threshold: {}",
        style(config.retrieval.similarity_threshold).cyan()
    );
    eprintln!(
        "  Max Retrieval Results: {}",
        style(config.retrieval.max_results).cyan()
    );
    eprintln!(
        "  Confidence Threshold: {}",
        style(config.classifier.confidence_threshold).cyan()
    );
    eprintln!(
        "  Max Response Length: {}",
        style(config.responder.max_response_length).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Sources:").bold().yellow());
    eprintln!(
        "  Docs: {}",
        style(config.sources.docs_dir.display()).cyan()
    );
    eprintln!(
        "  Knowledge Base: {}",
        style(config.sources.knowledge_base_dir.display()).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No usable configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_openai(openai: &mut OpenAiConfig) -> Result<()> {
    let api_base: String = Input::new()
        .with_prompt("API base URL")
        .default(openai.api_base.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let candidate = OpenAiConfig {
                api_base: input.clone(),
                ..OpenAiConfig::default()
            };
            candidate.api_url()?;
            Ok(())
        })
        .interact_text()?;

    let chat_model: String = Input::new()
        .with_prompt("Chat model")
        .default(openai.chat_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let embedding_model: String = Input::new()
        .with_prompt("Embedding model")
        .default(openai.embedding_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let embedding_dimension: u32 = Input::new()
        .with_prompt("Embedding dimension")
        .default(openai.embedding_dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (64..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 64 and 4096")
            }
        })
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding requests")
        .default(openai.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 2048 {
                Err("Batch size must be 2048 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    openai.set_api_base(api_base)?;
    openai.set_chat_model(chat_model)?;
    openai.set_embedding_model(embedding_model)?;
    openai.set_embedding_dimension(embedding_dimension)?;
    openai.set_batch_size(batch_size)?;

    if openai.resolved_api_key().is_none() {
        eprintln!(
            "{}",
            style("No API key found. Set OPENAI_API_KEY or add api_key to config.toml.").yellow()
        );
    }

    Ok(())
}

fn configure_thresholds(config: &mut Config) -> Result<()> {
    let similarity_threshold: f32 = Input::new()
        .with_prompt("Similarity threshold for retrieved knowledge")
        .default(config.retrieval.similarity_threshold)
        .validate_with(|input: &f32| -> Result<(), &str> {
            if (-1.0..=1.0).contains(input) {
                Ok(())
            } else {
                Err("Threshold must be between -1.0 and 1.0")
            }
        })
        .interact_text()?;

    let max_results: usize = Input::new()
        .with_prompt("Maximum knowledge records per request")
        .default(config.retrieval.max_results)
        .interact_text()?;

    let confidence_threshold: f32 = Input::new()
        .with_prompt("Classification confidence below which requests escalate")
        .default(config.classifier.confidence_threshold)
        .validate_with(|input: &f32| -> Result<(), &str> {
            if (0.0..=1.0).contains(input) {
                Ok(())
            } else {
                Err("Confidence must be between 0.0 and 1.0")
            }
        })
        .interact_text()?;

    config
        .retrieval
        .set_similarity_threshold(similarity_threshold)?;
    config.retrieval.set_max_results(max_results)?;
    config
        .classifier
        .set_confidence_threshold(confidence_threshold)?;

    Ok(())
}

fn test_api_connection(openai: &OpenAiConfig) -> bool {
    let Ok(url) = openai.api_url().and_then(|base| {
        base.join("models")
            .map_err(|_| ConfigError::InvalidUrl(base.to_string()))
    }) else {
        return false;
    };

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    let mut request = agent.get(url.as_str());
    if let Some(key) = openai.resolved_api_key() {
        request = request.header("Authorization", format!("Bearer {}", key));
    }

    match request.call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => true,
        Err(_) => false,
    }
}
