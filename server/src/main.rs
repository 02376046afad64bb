// tag_arena/server/src/main.rs
use anyhow::Context;
use tag_arena_core::core::config::SimConfig;
use tag_arena_core::operational::monitoring::{init_logging, MetricsSystem};
use tag_arena_core::server::instance::Stage;
use tag_arena_core::systems::bots::BotManager;
use tag_arena_core::world::map_generator::MapGenerator;
use tracing::{error, info};

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

const CONFIG_ENV: &str = "TAG_ARENA_CONFIG";

fn load_config() -> anyhow::Result<SimConfig> {
    match std::env::var(CONFIG_ENV) {
        Ok(path) => {
            info!("Loading configuration from {}", path);
            SimConfig::from_yaml_file(&path).with_context(|| format!("Failed to load {}", path))
        }
        Err(_) => Ok(SimConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC: {}", panic_info);
        eprintln!("Backtrace:\n{:?}", std::backtrace::Backtrace::capture());
    }));

    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {:?}", e);
        return Err(e);
    }

    info!(
        "Tag arena {} starting up ({} build, {})",
        built_info::PKG_VERSION,
        built_info::PROFILE,
        built_info::RUSTC_VERSION
    );

    let config = load_config()?;
    info!("Configuration loaded. Tick rate: {}, seed: {}", config.tick_rate, config.seed);

    let metrics = match config.metrics_listen {
        Some(listen) => {
            let system = MetricsSystem::install(listen)?;
            info!("Metrics exported on http://{}/metrics", system.listen());
            Some(system)
        }
        None => None,
    };

    let layout = MapGenerator::generate_arena(config.seed);
    let spawns = layout.character_spawns.clone();
    let mut bots = BotManager::new(config.bots.count);
    let mut stage = Stage::new(config, layout).context("Failed to build stage")?;
    bots.initialize_bots(&mut stage, &spawns).context("Failed to spawn bots")?;

    tokio::select! {
        result = stage.run(None) => {
            if let Err(e) = result {
                error!("Simulation stopped: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
        }
    }

    info!("Tag arena shut down after {} frames.", stage.frame());
    if let Some(metrics) = &metrics {
        info!("Metrics exporter on {} ran for {:.1}s", metrics.listen(), metrics.uptime_seconds());
    }
    Ok(())
}
