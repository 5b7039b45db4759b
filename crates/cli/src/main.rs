//! festa: storefront chat concierge.
//!
//! Wires the state store, order aggregator, session router, persistence, and
//! the Telegram transport together, then polls until shutdown.

use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    anyhow::Context,
    clap::Parser,
    secrecy::ExposeSecret,
    tracing::{info, warn},
    tracing_subscriber::EnvFilter,
};

use {
    festa_common::{transport::Transport, types::OperatorId},
    festa_orders::OrderAggregator,
    festa_persistence::Database,
    festa_router::{Responder, Router, sweep},
    festa_store::{StateStore, TimerSet},
    festa_telegram::TelegramTransport,
};

#[derive(Parser, Debug)]
#[command(name = "festa", about = "Storefront chat concierge bot")]
struct Args {
    /// Path to the config file (defaults to standard locations).
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Bot token override (otherwise from config).
    #[arg(long, env = "FESTA_BOT_TOKEN")]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => festa_config::load_config(path)?,
        None => festa_config::discover_and_load(),
    };
    if let Some(token) = args.token {
        config.telegram.token = secrecy::Secret::new(token);
    }
    if config.telegram.token.expose_secret().is_empty() {
        anyhow::bail!("no bot token configured (set telegram.token or FESTA_BOT_TOKEN)");
    }
    if config.operators.is_empty() {
        warn!("no operators configured; order requests will queue unseen");
    }
    info!(
        operators = config.operators.len(),
        "starting {}", config.storefront.name
    );
    let config = Arc::new(config);

    let db = Database::connect(&config.persistence.database_url)
        .await
        .context("connect to database")?;

    let bot = teloxide::Bot::new(config.telegram.token.expose_secret());
    let transport: Arc<dyn Transport> = Arc::new(TelegramTransport::new(bot.clone()));

    let store = Arc::new(StateStore::new());
    let timers = Arc::new(TimerSet::new());
    let operators: Vec<OperatorId> = config.operators.iter().map(|o| OperatorId(o.id)).collect();

    let aggregator = OrderAggregator::new(
        Arc::clone(&store),
        Arc::clone(&timers),
        Arc::clone(&transport),
        operators,
        Duration::from_secs(config.orders.auto_finalize_secs),
    );
    let responder = Responder::new(&config);
    let router = Router::new(
        Arc::clone(&config),
        Arc::clone(&store),
        timers,
        aggregator,
        Arc::clone(&transport),
        db.clone(),
        responder,
    );

    let cancel = festa_telegram::start_polling(bot, router)
        .await
        .context("start telegram polling")?;

    let sweep_task = sweep::spawn_reconciliation(
        Arc::clone(&store),
        Duration::from_secs(config.orders.sweep_interval_secs),
        cancel.clone(),
    );
    let snapshot_task = sweep::spawn_snapshot(
        db,
        store,
        Duration::from_secs(config.persistence.snapshot_interval_secs),
        cancel.clone(),
    );

    tokio::signal::ctrl_c().await.context("wait for ctrl-c")?;
    info!("shutting down");
    cancel.cancel();
    let _ = sweep_task.await;
    let _ = snapshot_task.await;

    Ok(())
}
