//! voxcheck - AI Voice Detection Service
//!
//! Classifies short spoken-audio clips as HUMAN or AI_GENERATED, with
//! optional automatic language identification over five supported languages.
//!
//! Both model instances (classifier artifact and language model) are loaded
//! here, before the listener binds, so the first request never pays
//! initialization cost and a missing artifact aborts startup instead of
//! failing per-request.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use voxcheck::config::Config;
use voxcheck::services::{LanguageModel, Pipeline, TrainedModel};
use voxcheck::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting voxcheck (AI Voice Detection) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Config::resolve()?;

    // Configuration-fatal: the service must not come up without its models
    let model = Arc::new(
        TrainedModel::load(&config.model_path)
            .with_context(|| format!("Failed to load classifier artifact: {}", config.model_path.display()))?,
    );
    info!(trees = model.tree_count(), "Classifier ready");

    let language_model = build_language_model(&config)?;

    let pipeline = Arc::new(Pipeline::new(model, language_model));
    let state = AppState::new(pipeline, config.api_keys.clone());
    let app = voxcheck::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(feature = "whisper")]
fn build_language_model(config: &Config) -> Result<Arc<dyn LanguageModel>> {
    use voxcheck::services::WhisperLanguageModel;

    let path = config
        .whisper_model_path
        .as_ref()
        .context("whisper_model_path not configured (VOXCHECK_WHISPER_MODEL_PATH)")?;
    let model = WhisperLanguageModel::load(path)
        .with_context(|| format!("Failed to initialize language model: {}", path.display()))?;
    Ok(Arc::new(model))
}

#[cfg(not(feature = "whisper"))]
fn build_language_model(_config: &Config) -> Result<Arc<dyn LanguageModel>> {
    use voxcheck::services::DisabledLanguageModel;

    tracing::warn!(
        "Built without the `whisper` feature; automatic language identification is disabled \
         and requests must supply an explicit language"
    );
    Ok(Arc::new(DisabledLanguageModel))
}
