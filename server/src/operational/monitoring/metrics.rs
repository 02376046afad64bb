// tag_arena/server/src/operational/monitoring/metrics.rs
use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

pub struct MetricsSystem {
    start_time: Instant,
    listen: SocketAddr,
}

impl MetricsSystem {
    /// Installs the Prometheus exporter on `listen` and describes every metric the
    /// simulation records.
    pub fn install(listen: SocketAddr) -> Result<Self> {
        PrometheusBuilder::new()
            .with_http_listener(listen)
            .install()
            .context("Failed to install Prometheus exporter")?;
        describe_metrics();
        Ok(MetricsSystem {
            start_time: Instant::now(),
            listen,
        })
    }

    pub fn listen(&self) -> SocketAddr {
        self.listen
    }

    pub fn uptime_seconds(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }
}

pub fn describe_metrics() {
    describe_counter!("arena_ticks_total", "Total number of simulation steps processed");
    describe_histogram!("arena_tick_seconds", "Wall time spent inside one simulation step");
    describe_gauge!("arena_agents", "Characters currently on the stage");
    describe_counter!("arena_tags_total", "Successful tags");
    describe_counter!("arena_props_smashed_total", "Props broken by characters");
    describe_counter!("arena_raycasts_total", "Segment visibility tests performed");
    describe_counter!("arena_bot_lost_total", "Times a bot dropped its plan and went lost");
    describe_counter!("arena_bot_decision_errors_total", "Bot decisions that failed with an error");
    describe_histogram!("arena_navgraph_build_seconds", "Time to build one navigation graph");
}

// Logging setup
pub fn init_logging() -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "tag_arena_core=info,tag_arena=info,warn".into()))
        .with(fmt::layer())
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}
