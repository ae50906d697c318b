// src/main.rs
// Inspection CLI: run the scoring pipeline against a piece of text and show
// what the classifier would do with it.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use curator::config::{ApiKeys, CuratorConfig};
use curator::limiter::RateLimiter;
use curator::scoring::StrategyChain;
use curator::types::TierAction;
use curator::Classifier;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "curator", version, about = "Classification pipeline inspection")]
struct Cli {
    /// Path to a config file (defaults to ~/.curator/config.toml)
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score a piece of text against every enabled category
    Score {
        /// The content to classify
        text: String,
        /// Associated URLs (repeatable)
        #[arg(long = "url")]
        urls: Vec<String>,
    },
    /// List the configured categories and their thresholds
    Categories,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "curator=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let contents = std::fs::read_to_string(path)?;
            CuratorConfig::from_toml(&contents)?
        }
        None => CuratorConfig::load(),
    };
    config.validate()?;

    match cli.command {
        Command::Score { text, urls } => score(&config, &text, urls).await,
        Command::Categories => {
            if config.categories.is_empty() {
                println!("No categories configured. Add [[categories]] entries to the config file.");
                return Ok(());
            }
            for category in &config.categories {
                println!(
                    "{:<16} auto_confirm={:>3}  suggest={:>3}  enabled={}",
                    category.name, category.auto_confirm, category.suggest, category.enabled
                );
            }
            Ok(())
        }
    }
}

async fn score(config: &CuratorConfig, text: &str, urls: Vec<String>) -> Result<()> {
    if config.enabled_categories().is_empty() {
        bail!("no enabled categories configured");
    }

    let api_keys = ApiKeys::from_env();
    let limiter = Arc::new(RateLimiter::default());
    let chain = Arc::new(StrategyChain::from_config(
        &api_keys,
        &config.llm.provider_order,
        limiter,
    ));
    let classifier = Classifier::new(chain, config.enabled_categories());

    let results = classifier.classify(text, &urls).await;
    for result in results {
        let action = match result.action {
            TierAction::AutoConfirm => "auto-confirm",
            TierAction::ShowSuggestion => "suggest",
            TierAction::Skip => "skip",
        };
        println!(
            "{:<16} score={:>3}  tier={:<12} action={}",
            result.category, result.score, result.tier.as_str(), action
        );
    }
    Ok(())
}
