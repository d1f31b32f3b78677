use anyhow::Result;
use clap::{Parser, Subcommand};
use help_desk::commands::{ask, evaluate, health, rebuild, resolve_config_dir};
use help_desk::config::{run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "help-desk")]
#[command(about = "An IT help desk that classifies requests, retrieves knowledge and drafts responses")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and the persisted knowledge base
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the LLM API connection and pipeline thresholds
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Submit a help desk request and print the response
    Ask {
        /// The user's message
        message: String,
        /// Optional id of the requesting user
        #[arg(long)]
        user_id: Option<String>,
        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Re-ingest the source documents and rebuild the knowledge base
    Rebuild,
    /// Show the health of each pipeline component
    Health {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replay scripted test requests and score the results
    Evaluate {
        /// Test requests file, defaults to <docs_dir>/test_requests.json
        path: Option<PathBuf>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = resolve_config_dir(cli.config_dir)?;

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Ask {
            message,
            user_id,
            json,
        } => {
            ask(&config_dir, message, user_id, json).await?;
        }
        Commands::Rebuild => {
            rebuild(&config_dir).await?;
        }
        Commands::Health { json } => {
            health(&config_dir, json).await?;
        }
        Commands::Evaluate { path, json } => {
            evaluate(&config_dir, path, json).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn ask_command_with_message() {
        let cli = Cli::try_parse_from(["help-desk", "ask", "I forgot my password"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask {
                message,
                user_id,
                json,
            } = parsed.command
            {
                assert_eq!(message, "I forgot my password");
                assert_eq!(user_id, None);
                assert!(!json);
            }
        }
    }

    #[test]
    fn ask_command_with_user_and_json() {
        let cli = Cli::try_parse_from([
            "help-desk",
            "ask",
            "VPN will not connect",
            "--user-id",
            "u-17",
            "--json",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask { user_id, json, .. } = parsed.command {
                assert_eq!(user_id, Some("u-17".to_string()));
                assert!(json);
            }
        }
    }

    #[test]
    fn config_dir_is_global() {
        let cli = Cli::try_parse_from(["help-desk", "rebuild", "--config-dir", "/tmp/desk"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert_eq!(parsed.config_dir, Some(PathBuf::from("/tmp/desk")));
            assert!(matches!(parsed.command, Commands::Rebuild));
        }
    }

    #[test]
    fn evaluate_defaults_path() {
        let cli = Cli::try_parse_from(["help-desk", "evaluate"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Evaluate { path, json } = parsed.command {
                assert_eq!(path, None);
                assert!(!json);
            }
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["help-desk", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn ask_requires_a_message() {
        let cli = Cli::try_parse_from(["help-desk", "ask"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["help-desk", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["help-desk", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
