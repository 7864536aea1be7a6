//--------------------------------------------------------------------------------------------------
// OFFLINE SIMULATOR
//--------------------------------------------------------------------------------------------------
// Two deterministic offline modes:
//   flow          generate a Poisson event stream and replay it through the
//                 engine (trades.csv, top.csv)
//   participants  run the live world in fast-forward with the synthetic
//                 participants (trades.csv, top.csv, accounts.csv)
//--------------------------------------------------------------------------------------------------

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use tickmatch::{
    write_accounts_csv, write_top_csv, write_trades_csv, FlowParams, LiveWorld, MarketMaker,
    MarketMakerParams, MatchingEngine, NoiseTrader, NoiseTraderConfig, OrderFlowGenerator,
    RuleSet, RulesConfig, Simulator, WorldConfig,
};

#[derive(Parser)]
#[command(name = "sim")]
#[command(about = "Deterministic offline runs of the matching engine")]
struct Cli {
    /// Directory the CSV outputs are written into
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a generated Poisson order flow through the engine
    Flow {
        #[arg(short, long, default_value = "1")]
        seed: u64,
        /// Horizon in seconds of exchange time
        #[arg(long, default_value = "2.0")]
        horizon: f64,
    },
    /// Run the live world in fast-forward with synthetic participants
    Participants {
        #[arg(short, long, default_value = "42")]
        seed: u64,
        /// Horizon in seconds of exchange time
        #[arg(long, default_value = "2.0")]
        horizon: f64,
        /// Tick interval in nanoseconds
        #[arg(long, default_value = "1000000")]
        dt_ns: i64,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    std::fs::create_dir_all(&cli.out_dir).expect("create output directory");

    match cli.command {
        Commands::Flow { seed, horizon } => run_flow(&cli.out_dir, seed, horizon),
        Commands::Participants {
            seed,
            horizon,
            dt_ns,
        } => run_participants(&cli.out_dir, seed, horizon, dt_ns),
    }
}

fn run_flow(out_dir: &std::path::Path, seed: u64, horizon: f64) {
    let mut gen = OrderFlowGenerator::new(seed, FlowParams::default());
    let events = gen.generate(0, horizon);

    let mut sim = Simulator::default();
    let result = sim.run(&events);

    write_trades_csv(&out_dir.join("trades.csv"), &result.trades).expect("write trades.csv");
    write_top_csv(&out_dir.join("top.csv"), &result.tops).expect("write top.csv");

    info!(
        events = events.len(),
        trades = result.trades.len(),
        cancel_failures = result.cancel_failures,
        modify_failures = result.modify_failures,
        "flow replay complete"
    );
}

fn run_participants(out_dir: &std::path::Path, seed: u64, horizon: f64, dt_ns: i64) {
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
        seed,
        horizon,
        WorldConfig {
            dt_ns,
            realtime: false,
        },
    );
    world.wait();

    let trades = world.trade_log();
    let tops = world.top_series();
    let accounts = world.accounts_snapshot();
    let stats = world.stats();

    write_trades_csv(&out_dir.join("trades.csv"), &trades).expect("write trades.csv");
    write_top_csv(&out_dir.join("top.csv"), &tops).expect("write top.csv");
    write_accounts_csv(&out_dir.join("accounts.csv"), world.current_ts(), &accounts)
        .expect("write accounts.csv");

    info!(
        steps = stats.steps,
        orders = stats.orders_sent,
        rejects = stats.rejects,
        trades = stats.trades,
        "participants run complete"
    );
}
