//! # blockdefaults - Block Default Settings
//!
//! Inspect and edit the default settings applied to new instances of each
//! block type.
//!
//! ## Quick Start
//!
//! ```bash
//! # Show the fully-defaulted Advanced Heading settings
//! cargo run -- show kadence/advancedheading
//!
//! # Make new headings default to h3, centered
//! cargo run -- set kadence/advancedheading level 3
//! cargo run -- set kadence/advancedheading align center
//!
//! # Use a specific settings file
//! cargo run -- --store ./site/settings.json blocks
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blockdefaults_core::{
    AppConfig, BlockSettings, ConfigurationStore, FieldValue, FileGateway, SchemaRegistry,
};

/// blockdefaults - default settings for editor blocks
#[derive(Parser, Debug)]
#[command(name = "blockdefaults")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Settings file holding the stored defaults
    #[arg(short, long, value_name = "FILE")]
    store: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// List block types that have stored defaults
    Blocks,

    /// Print the field table of a block type
    Fields {
        #[arg(default_value = blockdefaults_core::schema::ADVANCED_HEADING)]
        block: String,
    },

    /// Print every effective setting of a block type
    Show { block: String },

    /// Print one effective setting
    Get { block: String, field: String },

    /// Set a default (VALUE is JSON; bare words are taken as text)
    Set {
        block: String,
        field: String,
        value: String,
    },

    /// Remove a default so the built-in fallback applies again
    Unset { block: String, field: String },
}

/// Parses a command-line value: JSON first, plain text otherwise.
fn parse_value(raw: &str) -> FieldValue {
    serde_json::from_str(raw).unwrap_or_else(|_| FieldValue::from(raw))
}

fn print_settings(settings: &BlockSettings) {
    for (field, value) in settings.iter() {
        println!("{field} = {value}");
    }
}

fn init_logging(verbose: u8, configured: &str) {
    let log_level = match verbose {
        0 => configured.parse().unwrap_or(tracing::Level::WARN),
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load(),
    };

    init_logging(args.verbose, &config.logging.level);
    tracing::info!("Starting blockdefaults v{}", env!("CARGO_PKG_VERSION"));

    let path = match args.store {
        Some(path) => path,
        None => config.storage.resolved_path()?,
    };
    let gateway = Arc::new(FileGateway::with_setting_key(
        path,
        config.storage.setting_key.clone(),
    ));
    let mut store = ConfigurationStore::load(gateway).await;
    let schemas = SchemaRegistry::builtin();

    match args.command {
        Command::Blocks => {
            for block_type in store.configuration().block_types() {
                println!("{block_type}");
            }
        }
        Command::Fields { block } => {
            let schema = schemas
                .get(&block)
                .ok_or_else(|| anyhow::anyhow!("No field table for {}", block))?;
            for spec in schema.fields() {
                println!("{} = {}", spec.key, spec.fallback);
            }
        }
        Command::Show { block } => match schemas.get(&block) {
            Some(schema) => print_settings(&store.effective_settings(schema)),
            None => {
                if let Some(settings) = store.block_settings(&block) {
                    print_settings(settings);
                }
            }
        },
        Command::Get { block, field } => {
            let value = match schemas.get(&block) {
                Some(schema) => schema.resolve(store.block_settings(&block), &field),
                None => store
                    .block_settings(&block)
                    .and_then(|settings| settings.get(&field))
                    .cloned(),
            };
            match value {
                Some(value) => println!("{value}"),
                None => anyhow::bail!("{} has no value or default for {}", block, field),
            }
        }
        Command::Set {
            block,
            field,
            value,
        } => {
            store.open();
            store.set_field(block, field, parse_value(&value))?;
            store.save().await?;
        }
        Command::Unset { block, field } => {
            store.open();
            store.clear_field(block, field)?;
            store.save().await?;
        }
    }

    Ok(())
}
