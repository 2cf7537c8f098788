use std::env;
use std::sync::Arc;

use dotenvy::dotenv;
use salonbw_client::{
    ClientConfig, DurableStore, FileStore, InMemoryStore, RequestOptions, SALONBW_TOKEN_FILE,
    SessionController, SessionEvent,
};

mod tracing_setup;
use tracing_setup::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_tracing("demo_session");

    let config = ClientConfig::from_env();
    tracing::info!("Using API at {}", config.api_url);

    let durable: Arc<dyn DurableStore> = match SALONBW_TOKEN_FILE.as_ref() {
        Some(path) => Arc::new(FileStore::new(path)),
        None => Arc::new(InMemoryStore::new()),
    };

    let session = SessionController::builder(config)
        .durable_store(durable)
        .build()?;

    let mut events = session.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::LoggedIn { user_id, role } => {
                    tracing::info!("Logged in as user {} ({})", user_id, role)
                }
                SessionEvent::TokensRefreshed => tracing::info!("Tokens refreshed"),
                SessionEvent::LoggedOut { reason } => tracing::info!(?reason, "Logged out"),
            }
        }
    });

    session.wait_until_initialized().await;

    if !session.is_authenticated() {
        match (env::var("SALONBW_DEMO_EMAIL"), env::var("SALONBW_DEMO_PASSWORD")) {
            (Ok(email), Ok(password)) => session.login(&email, &password).await?,
            _ => {
                tracing::warn!(
                    "No saved session; set SALONBW_DEMO_EMAIL and SALONBW_DEMO_PASSWORD to log in"
                );
                return Ok(());
            }
        }
    }

    let state = session.state();
    println!("{}", serde_json::to_string_pretty(&state)?);

    let endpoint = env::var("SALONBW_DEMO_ENDPOINT").unwrap_or_else(|_| "/appointments".into());
    match session.request::<serde_json::Value>(&endpoint, RequestOptions::get()).await {
        Ok(payload) => match payload.json() {
            Some(body) => println!("{}", serde_json::to_string_pretty(&body)?),
            None => tracing::info!("{} returned no JSON body", endpoint),
        },
        Err(e) => tracing::error!("GET {} failed: {}", endpoint, e),
    }

    if env::var("SALONBW_DEMO_LOGOUT").is_ok_and(|v| v == "true") {
        session.logout().await;
    }

    Ok(())
}
