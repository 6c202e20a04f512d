//! `carebot-server`: serves both agents over HTTP using environment configuration.
//!
//! ```text
//! OPENAI_API_KEY=sk-... TAVILY_API_KEY=tvly-... REMINDER_URL=http://reminders/api \
//!     RUST_LOG=info cargo run --features http-server --bin carebot-server
//! ```

use carebot::{Agent, CarebotConfig, ConversationEngine, FileSessionStore};
use std::error::Error;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    carebot::init_logger();

    let config = CarebotConfig::from_env()?;
    if config.openai_api_key.is_empty() {
        log::warn!("OPENAI_API_KEY is not set; model calls will be rejected");
    }
    if config.reminder_url.is_none() {
        log::warn!("REMINDER_URL is not set; create_reminder will report failures");
    }

    let mut engine = ConversationEngine::new(Arc::new(FileSessionStore::new(&config.session_dir)))
        .with_max_cycles(config.max_cycles)
        .with_history_limit(config.history_limit);
    for agent in Agent::default_agents(&config).await? {
        log::info!(
            "registered agent '{}' ({} tools, model {})",
            agent.kind(),
            agent.tools().len(),
            agent.client().model_name()
        );
        engine.register_agent(agent);
    }

    carebot::server::serve(Arc::new(engine), &config.bind_addr).await
}
