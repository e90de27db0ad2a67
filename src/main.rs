use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use newslabel::api::app_api_loop;
use newslabel::classifier::{LabelClassifier, LabelOutcome, ModelConfig};
use newslabel::environment::{validate_threshold, AppConfig};
use newslabel::logging::configure_logging;

#[derive(Parser)]
#[clap(name = "newslabel", about = "Fetch news feeds and label articles by topic")]
struct Cli {
    /// Directory holding tokenizer.json, config.json and the model weights
    #[clap(long, global = true)]
    model_path: Option<PathBuf>,

    #[clap(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the web page and JSON API (default)
    Serve {
        /// Port to listen on
        #[clap(short, long)]
        port: Option<u16>,

        /// Load the model before accepting requests
        #[clap(long)]
        preload: bool,
    },

    /// Classify a single article and print its labels
    Classify {
        #[clap(short, long)]
        title: String,

        #[clap(short, long, default_value = "")]
        description: String,

        /// Probability threshold (0.0-1.0)
        #[clap(long)]
        threshold: Option<f32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    configure_logging();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(model_path) = cli.model_path {
        config.model_path = model_path;
    }

    let classifier = Arc::new(
        LabelClassifier::new(ModelConfig::new(&config.model_path)).with_threshold(config.threshold),
    );

    match cli.command.unwrap_or(Commands::Serve {
        port: None,
        preload: false,
    }) {
        Commands::Serve { port, preload } => {
            if let Some(port) = port {
                config.port = port;
            }
            if preload {
                let loader = Arc::clone(&classifier);
                tokio::task::spawn_blocking(move || loader.ensure_loaded().map(|_| ())).await??;
            }
            info!(
                "Collecting {} feeds, model at {}",
                config.feed_urls.len(),
                config.model_path.display()
            );
            app_api_loop(&config, classifier).await
        }
        Commands::Classify {
            title,
            description,
            threshold,
        } => {
            let threshold = validate_threshold(threshold.unwrap_or(config.threshold))?;
            let outcome = tokio::task::spawn_blocking(move || {
                classifier.classify(&title, &description, threshold)
            })
            .await?;

            match outcome {
                LabelOutcome::Failed(e) => {
                    error!("Classification failed: {}", e);
                    Err(e.into())
                }
                outcome => {
                    println!("{} ({})", outcome.labels().join(", "), outcome.kind());
                    Ok(())
                }
            }
        }
    }
}
