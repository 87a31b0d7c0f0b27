use std::sync::Arc;

use speaklet::ai::GroqClient;
use speaklet::config::AppConfig;
use speaklet::prompts::PromptTemplates;
use speaklet::server::{self, AppState};
use speaklet::store::AppletStore;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env();
    if config.groq_api_key.is_empty() {
        log::warn!("GROQ_API_KEY is not set; transcription and generation will fail");
    }

    if let Err(e) = std::fs::create_dir_all(&config.upload_dir) {
        log::error!("Failed to create upload directory {:?}: {}", config.upload_dir, e);
        std::process::exit(1);
    }

    // A missing template is fatal; there is no fallback prompt.
    let templates = match PromptTemplates::load(&config.prompt_dir) {
        Ok(templates) => templates,
        Err(e) => {
            log::error!("Failed to load prompt templates from {:?}: {}", config.prompt_dir, e);
            std::process::exit(1);
        }
    };

    let ai = GroqClient::new(config.groq_api_key.clone());
    let store = AppletStore::new(config.upload_dir.clone());
    let bind_addr = config.bind_addr;

    let state = Arc::new(AppState {
        config,
        store,
        templates,
        ai,
    });
    let app = server::router(state);

    let listener = match tokio::net::TcpListener::bind(bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("Failed to bind {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };

    log::info!("speaklet listening on http://{}", bind_addr);
    if let Err(e) = axum::serve(listener, app).await {
        log::error!("Server error: {}", e);
    }
}
