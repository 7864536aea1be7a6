//--------------------------------------------------------------------------------------------------
// LIVE GATEWAY
//--------------------------------------------------------------------------------------------------
// Runs a live world with the default synthetic participants (one noise
// trader, one market maker) and serves the HTTP API over it. Configuration
// comes from the environment (BIND_ADDR, WORLD_SEED, HORIZON_SECONDS, DT_NS).
//--------------------------------------------------------------------------------------------------

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use tickmatch::{
    Api, Config, LiveWorld, MarketMaker, MarketMakerParams, MatchingEngine, NoiseTrader,
    NoiseTraderConfig, RuleSet, RulesConfig, WorldConfig,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env();
    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .unwrap_or_else(|_| panic!("invalid bind address: {}", config.bind_addr));

    let rules_cfg = RulesConfig::default();
    let engine = MatchingEngine::with_rules(RuleSet::new(rules_cfg));

    let world = Arc::new(LiveWorld::new(engine));
    world.add_participant(Box::new(NoiseTrader::new(1, NoiseTraderConfig::default())));
    world.add_participant(Box::new(MarketMaker::new(
        2,
        rules_cfg,
        MarketMakerParams::default(),
    )));

    world.start(
        config.seed,
        config.horizon_seconds,
        WorldConfig {
            dt_ns: config.dt_ns,
            realtime: true,
        },
    );
    info!(seed = config.seed, "live world running");

    let api = Api::new(addr, Arc::clone(&world));
    if let Err(err) = api.serve().await {
        eprintln!("gateway terminated: {err}");
    }

    world.stop();
}
