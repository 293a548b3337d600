use anyhow::Context;
use clap::{Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use fare_predictor::{
    api, config::ProjectPaths, logging, model, pipeline, AppState, LinearModel, Regressor,
};

#[derive(Parser)]
#[command(name = "fare_predictor")]
#[command(about = "Taxi fare prediction API and data pipeline")]
struct Cli {
    /// Project root; data, model and log paths are resolved against it
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// JSON file overriding the default project paths
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve POST /predict and GET /health
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: std::net::IpAddr,

        #[arg(long, env = "PORT", default_value_t = 8000)]
        port: u16,

        /// Model artifact; defaults to the project's saved model
        #[arg(long = "model", env = "MODEL_PATH")]
        model_path: Option<PathBuf>,
    },
    /// Clean the raw export into the processed table
    MakeDataset,
    /// Derive feature columns from the processed table
    BuildFeatures,
    /// Run make-dataset and build-features in order, then check the model artifact
    Pipeline,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match &cli.config {
        Some(cfg) => ProjectPaths::load(cfg, &cli.root)?,
        None => ProjectPaths::under(&cli.root),
    };
    logging::init(Some(paths.log_file().as_path()))?;

    match cli.command {
        Commands::Serve { host, port, model_path } => {
            let model_path = model_path.unwrap_or_else(|| paths.model.clone());
            // A model that cannot load or predict must keep the server down.
            let mdl = LinearModel::load(&model_path).map_err(|e| {
                tracing::error!("model unavailable: {:#}", e);
                e
            })?;
            let probe = model::warmup(&mdl)?;
            tracing::info!("warmup forward ok (intercept-only fare {:.3})", probe);
            tracing::info!(
                "loaded model {}; feature_names[{}]: {:?}",
                model_path.display(),
                mdl.feature_names().len(),
                mdl.feature_names()
            );

            let state = AppState::new(Arc::new(mdl));
            api::serve(SocketAddr::new(host, port), state).await?;
        }
        Commands::MakeDataset => {
            pipeline::make_dataset(&paths).context("make-dataset failed")?;
        }
        Commands::BuildFeatures => {
            pipeline::build_features(&paths).context("build-features failed")?;
        }
        Commands::Pipeline => {
            pipeline::run(&paths)?;
        }
    }
    Ok(())
}
