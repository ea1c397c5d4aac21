#[macro_use]
extern crate log;

use std::{env, path::Path, sync::Arc};

use anyhow::{Context, Result};
use dotenv::dotenv;

use race_announcer::{
    config::Config,
    connectors::ConnectorRegistry,
    events::{ChangeFeed, LogSink},
    store::{EntityStore, MemoryStore},
    sync::SourceWorker,
};

const CONFIG_VAR: &str = "RACE_ANNOUNCER_CONFIG";
const DEFAULT_CONFIG: &str = "config.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = load_config()?;
    let store = open_store()?;
    let feed = Arc::new(ChangeFeed::new());
    feed.subscribe(Arc::new(LogSink)).await;

    let registry = ConnectorRegistry::with_defaults();
    let mut workers = Vec::with_capacity(config.connectors.len());
    for connector_config in &config.connectors {
        let connector = registry
            .build(connector_config)
            .with_context(|| format!("Could not set up connector {}", connector_config.connector))?;
        let mut worker = SourceWorker::new(
            connector,
            Arc::clone(&store),
            Arc::clone(&feed),
            connector_config.clone(),
        );
        worker.start();
        workers.push(worker);
    }

    tokio::signal::ctrl_c()
        .await
        .context("Could not listen for shutdown signal")?;
    info!("Shutting down");
    for worker in workers {
        worker.dispose().await;
    }

    Ok(())
}

fn load_config() -> Result<Config> {
    let path = env::var(CONFIG_VAR).unwrap_or_else(|_| DEFAULT_CONFIG.to_owned());
    if Path::new(&path).exists() {
        let config = Config::load(&path)?;
        info!("Loaded config from {}", path);
        return Ok(config);
    }

    warn!("No config at {}, syncing racetime.gg with default intervals", path);
    Ok(Config::default())
}

#[cfg(feature = "mysql")]
fn open_store() -> Result<Arc<dyn EntityStore>> {
    use race_announcer::store::{get_pool, MysqlStore};

    match env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = get_pool(&url).context("Could not connect to database")?;
            Ok(Arc::new(MysqlStore::new(pool)))
        }
        Err(_) => {
            warn!("DATABASE_URL is not set, nothing will be persisted across restarts");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[cfg(not(feature = "mysql"))]
fn open_store() -> Result<Arc<dyn EntityStore>> {
    if env::var("DATABASE_URL").is_ok() {
        warn!("DATABASE_URL is set but this build has no mysql support");
    }
    warn!("Using in-memory store, nothing will be persisted across restarts");

    Ok(Arc::new(MemoryStore::new()))
}
