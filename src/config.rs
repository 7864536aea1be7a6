use dotenv::dotenv;
use std::env;
use tracing::info;

use crate::types::Ts;

const BIND_ADDR: &str = "BIND_ADDR";
const WORLD_SEED: &str = "WORLD_SEED";
const HORIZON_SECONDS: &str = "HORIZON_SECONDS";
const DT_NS: &str = "DT_NS";

/// Gateway runtime configuration, loaded from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: String,
    pub seed: u64,
    pub horizon_seconds: f64,
    pub dt_ns: Ts,
}

impl Config {
    pub fn from_env() -> Config {
        match Self::try_from_env() {
            Ok(config) => config,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_from_env() -> Result<Config, String> {
        // Load .env file if present
        dotenv().ok();

        let bind_addr = env::var(BIND_ADDR).unwrap_or_else(|_| "127.0.0.1:8080".to_string());

        let seed = match env::var(WORLD_SEED) {
            Ok(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| format!("failed to parse environment variable {}", WORLD_SEED))?,
            Err(_) => 1,
        };

        let horizon_seconds = match env::var(HORIZON_SECONDS) {
            Ok(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("failed to parse environment variable {}", HORIZON_SECONDS))?,
            Err(_) => 3600.0,
        };

        let dt_ns = match env::var(DT_NS) {
            Ok(s) => s
                .trim()
                .parse::<Ts>()
                .map_err(|_| format!("failed to parse environment variable {}", DT_NS))?,
            Err(_) => 1_000_000,
        };
        if dt_ns <= 0 {
            return Err(format!("{} must be positive", DT_NS));
        }

        info!(%bind_addr, seed, horizon_seconds, dt_ns, "config loaded");

        Ok(Config {
            bind_addr,
            seed,
            horizon_seconds,
            dt_ns,
        })
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            bind_addr: "127.0.0.1:8080".to_string(),
            seed: 1,
            horizon_seconds: 3600.0,
            dt_ns: 1_000_000,
        }
    }
}
