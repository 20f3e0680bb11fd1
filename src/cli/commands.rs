//! Command implementations for the CLI
//!
//! `serve` assembles the gateway in a fixed order: cache, HTTP client,
//! currency service, providers, listener, heartbeat. Any failure before the
//! listener accepts its first connection aborts startup.

use std::sync::Arc;

use tracing::info;

use crate::app::cache::ResultCache;
use crate::app::client::ImageClient;
use crate::app::clock::{Clock, SystemClock};
use crate::app::context::AppContext;
use crate::app::currency::CurrencyRateService;
use crate::app::provider::ProviderRegistry;
use crate::config::AppConfig;
use crate::errors::Result;
use crate::server::listener;
use crate::server::{
    create_shutdown_channel, router, ConnectionManager, GatewayState, IdentityLimiter, SignalHandler,
};

use super::args::{CacheAction, CacheArgs, ConfigAction, ConfigArgs, RateArgs};

/// Run the gateway until Ctrl+C or SIGTERM
pub async fn handle_serve(config: AppConfig) -> Result<()> {
    config.validate()?;
    let runtime = config.to_runtime_config();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let (shutdown_tx, _) = create_shutdown_channel();
    let refresher_shutdown = shutdown_tx.subscribe();
    let heartbeat_shutdown = shutdown_tx.subscribe();
    let listener_shutdown = shutdown_tx.subscribe();
    let signal_task = SignalHandler::new(shutdown_tx.clone()).setup();

    info!("[cache] Loading...");
    let cache = ResultCache::open(&runtime.cache, Arc::clone(&clock)).await?;

    info!("[http] Building client...");
    let images = ImageClient::from_config(&runtime.client)?;
    let http = images.http();

    info!("[currency converter] Loading...");
    let rate_source = runtime.currency.build_source(Arc::clone(&http))?;
    let rates = Arc::new(CurrencyRateService::new(
        rate_source,
        runtime.currency.clone(),
        Arc::clone(&clock),
    ));
    let refresher = Arc::clone(&rates).spawn_refresher(refresher_shutdown);

    let context = Arc::new(AppContext::new(cache, Arc::new(images), Arc::clone(&rates)));
    let registry = ProviderRegistry::from_config(&runtime.providers, context, http)?;
    info!("Providers: {}", registry.names().join(", "));
    let bootstraps = registry.spawn_bootstrap();

    let manager = Arc::new(ConnectionManager::new(
        registry,
        IdentityLimiter::new(runtime.rate_limit_points, runtime.rate_limit_window)?,
        IdentityLimiter::new(runtime.rate_limit_points, runtime.rate_limit_window)?,
        runtime.heartbeat_interval,
    ));

    let tcp = listener::bind(runtime.listen_addr).await?;
    let heartbeat = Arc::clone(&manager).spawn_heartbeat(heartbeat_shutdown);
    let app = router(GatewayState {
        manager: Arc::clone(&manager),
        rates,
    });

    listener::serve(tcp, app, manager, listener_shutdown).await;

    for task in bootstraps {
        task.abort();
    }
    let _ = heartbeat.await;
    let _ = refresher.await;
    signal_task.abort();

    info!("Gateway stopped");
    Ok(())
}

/// Fetch the exchange rate once
pub async fn handle_rate(config: AppConfig, args: RateArgs) -> Result<()> {
    let mut currency = config.currency.to_runtime_config();
    if let Some(from) = args.from {
        currency.from = from.to_uppercase();
    }
    if let Some(to) = args.to {
        currency.to = to.to_uppercase();
    }

    let images = ImageClient::from_config(&config.client.to_runtime_config())?;
    let source = currency.build_source(images.http())?;
    let service = CurrencyRateService::new(source, currency, Arc::new(SystemClock));

    let factor = service.refresh().await?;
    let rate = service.snapshot();
    println!("💱 1 {} = {} {}", rate.from, factor, rate.to);
    if let Some(example) = service.convert(100.0) {
        println!("   100.00 {} = {} {}", rate.from, example, rate.to);
    }
    Ok(())
}

/// Inspect or purge the result cache
pub async fn handle_cache(mut config: AppConfig, args: CacheArgs) -> Result<()> {
    if let Some(dir) = args.cache_dir {
        config.cache.cache_root = Some(dir);
    }
    let cache_config = config.cache.to_runtime_config();
    let cache = ResultCache::open(&cache_config, Arc::new(SystemClock)).await?;

    match args.action {
        CacheAction::Stats => {
            let stats = cache.stats().await?;
            println!("📊 Result Cache");
            println!("===============");
            println!("Backend:         {:?}", cache_config.backend);
            if let Ok(root) = cache_config.resolve_root() {
                println!("Location:        {}", root.display());
            }
            println!("Stored entries:  {}", stats.total_entries);
            println!("Valid entries:   {}", stats.valid_entries);
            println!("Expired entries: {}", stats.expired_entries());
        }
        CacheAction::Purge => {
            let removed = cache.purge_expired().await?;
            println!("🧹 Removed {} expired entries", removed);
        }
    }
    Ok(())
}

/// Write or show the configuration
pub async fn handle_config(config: AppConfig, args: ConfigArgs) -> Result<()> {
    match args.action {
        ConfigAction::Init => {
            let path = AppConfig::initialize_first_run().await?;
            println!("📁 Configuration file:");
            println!("   {}", path.display());
            println!("   You can customize settings by editing this file.");
        }
        ConfigAction::Show => {
            print!("{}", config.to_toml()?);
        }
    }
    Ok(())
}
