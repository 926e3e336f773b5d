//! Slotwatch - Reward availability watcher

use anyhow::Context;
use slotwatch_bot::telegram::{spawn_command_loop, CommandHandler, TelegramApi, TelegramNotifier};
use slotwatch_bot::Config;
use slotwatch_engine::{
    spawn_update_loop, LogNotifier, Notifier, SystemClock, TrackingService, UpdateConfig,
    UpdateJob,
};
use slotwatch_networking::{FetchDispatcher, PatreonClient};
use slotwatch_persistence::{ApiCaches, Database};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "slotwatch=debug,slotwatch_bot=debug,slotwatch_engine=debug,slotwatch_networking=info,slotwatch_persistence=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Slotwatch starting up");

    if let Err(e) = run(Config::from_env()).await {
        tracing::error!("FATAL: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    let db = Database::connect(&config.database_path)
        .await
        .with_context(|| format!("opening database {}", config.database_path.display()))?;
    tracing::info!("Database ready at {}", config.database_path.display());

    let caches = ApiCaches::new(&config.cache);
    let sweepers = caches.spawn_sweepers(&cancel);

    let client = PatreonClient::with_base_url(&config.api_base_url)?;
    let dispatcher = FetchDispatcher::new(Arc::new(client), caches, &config.dispatcher);
    let store = Arc::new(db);

    let mut tasks = sweepers;

    let notifier: Arc<dyn Notifier> = match &config.telegram_bot_token {
        Some(token) => {
            let api = TelegramApi::new(token)?;
            let tracking = Arc::new(TrackingService::new(store.clone(), dispatcher.clone()));
            let handler = CommandHandler::new(
                api.clone(),
                tracking,
                config.telegram_creator_id,
                config.api_base_url.clone(),
            );
            tasks.push(spawn_command_loop(Arc::new(handler), cancel.child_token()));
            Arc::new(TelegramNotifier::new(api, config.api_base_url.clone()))
        }
        None => {
            tracing::warn!("No Telegram bot token set, notifications only go to the log");
            Arc::new(LogNotifier)
        }
    };

    let job = UpdateJob::new(
        store,
        dispatcher,
        notifier,
        Arc::new(SystemClock),
        UpdateConfig::default(),
    );
    tasks.push(spawn_update_loop(
        job,
        config.update_interval,
        cancel.child_token(),
    ));

    tracing::info!("Background tasks spawned successfully");

    shutdown_signal().await;
    tracing::info!("Shutdown requested, waiting for running work to finish");
    cancel.cancel();

    for task in tasks {
        if let Err(e) = task.await {
            tracing::warn!("Background task ended abnormally: {}", e);
        }
    }

    tracing::info!("Slotwatch exiting");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
