// Configuration management module
// TOML settings plus the interactive setup and display commands

pub mod interactive;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    ClassifierConfig, Config, ConfigError, OpenAiConfig, ResponderConfig, RetrievalConfig,
    SourcesConfig,
};
