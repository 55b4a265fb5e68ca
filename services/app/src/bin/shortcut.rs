//! services/app/src/bin/shortcut.rs

use app_lib::{
    adapters::{FirebaseAuthAdapter, FirestoreAdapter, MemoryBackend},
    app::ShortcutApp,
    config::{Backend, Config},
    context::AppContext,
    driver::{self, Command, Flow},
    error::AppError,
    session_task::spawn_session_listener,
};
use shortcut_core::ports::{DocumentStore, IdentityService};
use shortcut_core::theme::ColorScheme;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEMO_EMAIL: &str = "demo@aishortcut.app";
const DEMO_PASSWORD: &str = "shortcut";

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded. Starting AI ShortCut...");

    // --- 2. Initialize Backend Adapters ---
    let (identity, store): (Arc<dyn IdentityService>, Arc<dyn DocumentStore>) =
        match &config.backend {
            Backend::Firebase {
                api_key,
                project_id,
            } => {
                let client = reqwest::Client::builder()
                    .timeout(config.request_timeout)
                    .build()?;
                let auth = Arc::new(FirebaseAuthAdapter::new(client.clone(), api_key.clone()));
                let firestore = Arc::new(FirestoreAdapter::new(
                    client,
                    project_id,
                    config.articles_collection.clone(),
                    config.users_collection.clone(),
                    auth.clone(),
                ));
                info!(%project_id, "Using the Firebase backend.");
                (auth, firestore)
            }
            Backend::Memory => {
                let backend = Arc::new(MemoryBackend::with_sample_articles());
                backend.add_account(DEMO_EMAIL, DEMO_PASSWORD, Some("Demo Reader"));
                info!(
                    "Using the in-memory backend. Demo account: {} / {}",
                    DEMO_EMAIL, DEMO_PASSWORD
                );
                (backend.clone(), backend)
            }
        };

    // --- 3. Build the Application Context ---
    let (ctx, mut notices) = AppContext::init(config.clone(), identity.clone(), store, ColorScheme::Light);
    let mut app = ShortcutApp::new(ctx);

    // --- 4. Start the Session Listener ---
    let (event_tx, mut events) = mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();
    let listener = spawn_session_listener(identity, event_tx, shutdown.clone());

    // --- 5. Drive the App from stdin ---
    println!("{}", driver::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                app.handle_event(event).await;
                print!("{}", driver::render(&app));
            }
            Some(notice) = notices.recv() => {
                println!("{}", driver::render_notice(notice.level, &notice.title, &notice.message));
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("Input closed.");
                    break;
                };
                let command = match line.parse::<Command>() {
                    Ok(command) => command,
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                };
                match driver::execute(&mut app, command).await {
                    Ok(Flow::Exit) => break,
                    Ok(Flow::Continue) => print!("{}", driver::render(&app)),
                    Err(AppError::Command(e)) => println!("{}", e),
                    Err(e) => {
                        warn!("Command failed: {e}");
                        println!("{}", e);
                    }
                }
            }
        }
    }

    // --- 6. Shut Down ---
    shutdown.cancel();
    if let Err(e) = listener.await {
        error!("Session listener did not shut down cleanly: {e}");
    }
    info!("Goodbye.");
    Ok(())
}
