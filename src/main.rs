use log::{error, warn};
use service::{config::Config, logging::Logger};
use std::sync::Arc;

use domain::gateway::oauth::{dingtalk, feishu};
use domain::Provider;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    // Construct one provider instance per configured platform and inject
    // them into the web layer. A platform with missing credentials is
    // skipped rather than taking the whole server down.
    let mut providers: Vec<Arc<dyn Provider>> = Vec::new();

    match feishu::new_provider(&config) {
        Ok(provider) => providers.push(Arc::new(provider)),
        Err(e) => warn!("Feishu login disabled, provider not configured: {e}"),
    }

    match dingtalk::new_provider(&config) {
        Ok(provider) => providers.push(Arc::new(provider)),
        Err(e) => warn!("DingTalk login disabled, provider not configured: {e}"),
    }

    let app_state = web::AppState::new(config, providers);

    if let Err(e) = web::init_server(app_state).await {
        error!("Server failed to start: {e}");
        std::process::exit(1);
    }
}
