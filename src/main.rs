use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use signage::config::Config;
use signage::content::HttpContentChecker;
use signage::db::Database;
use signage::lifecycle::AssetManager;
use signage::server::routes;
use signage::storage::ObjectStoreAssetFiles;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is fine, the environment and flags still apply.
    dotenvy::dotenv().ok();
    let cli = Config::parse();
    init_tracing(cli.log_json);

    let db = Database::file(&cli.database)?;
    let checker = HttpContentChecker::new(cli.check_timeout())?;
    let files = ObjectStoreAssetFiles::local(&cli.asset_dir)?;
    info!(
        database = %cli.database.display(),
        asset_dir = %files.root().display(),
        "opened asset storage"
    );

    let manager = AssetManager::new(db, Arc::new(checker), Arc::new(files));
    manager.repair()?;

    let (addr, server) = warp::serve(routes(manager))
        .try_bind_with_graceful_shutdown(cli.listen, async {
            tokio::signal::ctrl_c().await.ok();
        })?;
    info!(%addr, "listening");

    server.await;
    info!("shut down");

    Ok(())
}
